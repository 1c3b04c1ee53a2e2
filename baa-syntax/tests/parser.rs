use baa_lexer::Lexer;
use baa_syntax::{
    ast::{BinaryOp, LiteralValue, Modifiers, Node, NodeKind, UnaryOp},
    types::TypeRegistry,
    Parser,
};
use indoc::indoc;

fn parse(source: &str) -> (Node, bool, usize) {
    let registry = TypeRegistry::new();
    let mut parser = Parser::new(Lexer::new(source, "<اختبار>"), &registry);
    let program = parser.parse_program();
    (program, parser.had_error(), parser.diagnostics().len())
}

fn parse_ok(source: &str) -> Vec<Node> {
    let (program, had_error, _) = parse(source);
    assert!(!had_error, "unexpected syntax errors in {source:?}");
    match program.kind {
        NodeKind::Program { declarations } => declarations,
        other => panic!("expected a program node, got {}", other.name()),
    }
}

fn single_expression(source: &str) -> Node {
    let mut declarations = parse_ok(source);
    assert_eq!(declarations.len(), 1);
    match declarations.remove(0).kind {
        NodeKind::ExprStmt { expr } => *expr,
        other => panic!("expected an expression statement, got {}", other.name()),
    }
}

#[test]
fn empty_source_yields_empty_program() {
    let declarations = parse_ok("");
    assert!(declarations.is_empty());
}

#[test]
fn variable_declaration() {
    let declarations = parse_ok("عدد_صحيح س = 5.");
    match &declarations[0].kind {
        NodeKind::VarDecl {
            name,
            modifiers,
            type_spec,
            initializer,
        } => {
            assert_eq!(name, "س");
            assert!(modifiers.is_empty());
            assert!(matches!(
                &type_spec.kind,
                NodeKind::TypeSpec { name, is_array: false, .. } if name == "عدد_صحيح"
            ));
            assert!(initializer.is_some());
        }
        other => panic!("expected a variable declaration, got {}", other.name()),
    }
}

#[test]
fn const_modifier_is_recorded() {
    let declarations = parse_ok("ثابت عدد_حقيقي نسبة = 0.5.");
    match &declarations[0].kind {
        NodeKind::VarDecl { modifiers, .. } => {
            assert!(modifiers.contains(Modifiers::CONST));
        }
        other => panic!("expected a variable declaration, got {}", other.name()),
    }
}

#[test]
fn array_type_specifier() {
    let declarations = parse_ok("عدد_صحيح[10] مصفوفة.");
    match &declarations[0].kind {
        NodeKind::VarDecl { type_spec, .. } => match &type_spec.kind {
            NodeKind::TypeSpec {
                is_array,
                array_size,
                ..
            } => {
                assert!(*is_array);
                assert!(array_size.is_some());
            }
            other => panic!("expected a type specifier, got {}", other.name()),
        },
        other => panic!("expected a variable declaration, got {}", other.name()),
    }
}

#[test]
fn unsized_array_type() {
    let declarations = parse_ok("حرف[] نص.");
    match &declarations[0].kind {
        NodeKind::VarDecl { type_spec, .. } => {
            assert!(matches!(
                &type_spec.kind,
                NodeKind::TypeSpec {
                    is_array: true,
                    array_size: None,
                    ..
                }
            ));
        }
        other => panic!("expected a variable declaration, got {}", other.name()),
    }
}

#[test]
fn function_definition_with_parameters() {
    let declarations = parse_ok(indoc! {"
        عدد_صحيح جمع(عدد_صحيح أول, عدد_صحيح ثان) {
            إرجع أول.
        }
    "});
    match &declarations[0].kind {
        NodeKind::FunctionDef {
            name,
            parameters,
            body,
            ..
        } => {
            assert_eq!(name, "جمع");
            assert_eq!(parameters.len(), 2);
            assert!(matches!(
                &parameters[0].kind,
                NodeKind::Parameter { name, .. } if name == "أول"
            ));
            assert!(matches!(&body.kind, NodeKind::Block { statements } if statements.len() == 1));
        }
        other => panic!("expected a function definition, got {}", other.name()),
    }
}

#[test]
fn empty_parameter_list() {
    let declarations = parse_ok("فراغ رئيسية() { }");
    assert!(matches!(
        &declarations[0].kind,
        NodeKind::FunctionDef { parameters, .. } if parameters.is_empty()
    ));
}

#[test]
fn precedence_multiplication_binds_tighter() {
    let expr = single_expression("1 + 2 * 3.");
    match expr.kind {
        NodeKind::Binary { op, right, .. } => {
            assert_eq!(op, BinaryOp::Add);
            assert!(matches!(
                right.kind,
                NodeKind::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            ));
        }
        other => panic!("expected a binary node, got {}", other.name()),
    }
}

#[test]
fn subtraction_is_left_associative() {
    let expr = single_expression("10 - 2 - 3.");
    match expr.kind {
        NodeKind::Binary { op, left, .. } => {
            assert_eq!(op, BinaryOp::Sub);
            assert!(matches!(
                left.kind,
                NodeKind::Binary {
                    op: BinaryOp::Sub,
                    ..
                }
            ));
        }
        other => panic!("expected a binary node, got {}", other.name()),
    }
}

#[test]
fn logic_binds_loosest() {
    let expr = single_expression("1 < 2 && 3 == 3 || 0.");
    assert!(matches!(
        expr.kind,
        NodeKind::Binary {
            op: BinaryOp::Or,
            ..
        }
    ));
}

#[test]
fn unary_operators_nest() {
    let expr = single_expression("-!س.");
    match expr.kind {
        NodeKind::Unary { op, operand } => {
            assert_eq!(op, UnaryOp::Minus);
            assert!(matches!(
                operand.kind,
                NodeKind::Unary {
                    op: UnaryOp::Not,
                    ..
                }
            ));
        }
        other => panic!("expected a unary node, got {}", other.name()),
    }
}

#[test]
fn call_with_arguments() {
    let expr = single_expression("اجمع(1, 2 + 3).");
    match expr.kind {
        NodeKind::Call { callee, arguments } => {
            assert!(matches!(
                callee.kind,
                NodeKind::Identifier { ref name } if name == "اجمع"
            ));
            assert_eq!(arguments.len(), 2);
        }
        other => panic!("expected a call node, got {}", other.name()),
    }
}

#[test]
fn chained_calls() {
    let expr = single_expression("مولد()(5).");
    assert!(matches!(
        expr.kind,
        NodeKind::Call { ref callee, .. } if matches!(callee.kind, NodeKind::Call { .. })
    ));
}

#[test]
fn literal_types_come_from_the_registry() {
    let registry = TypeRegistry::new();
    let mut parser = Parser::new(Lexer::new("42.", "<اختبار>"), &registry);
    let program = parser.parse_program();
    let NodeKind::Program { declarations } = program.kind else {
        panic!();
    };
    let NodeKind::ExprStmt { expr } = &declarations[0].kind else {
        panic!();
    };
    match &expr.kind {
        NodeKind::Literal { value, type_id } => {
            assert_eq!(*value, LiteralValue::Int("42".into()));
            assert_eq!(*type_id, registry.int());
        }
        other => panic!("expected a literal, got {}", other.name()),
    }
}

#[test]
fn control_flow_statements() {
    let declarations = parse_ok(indoc! {"
        فراغ اختبار() {
            إذا (س < 10) {
                س(1).
            } وإلا {
                س(2).
            }
            طالما (صحيح) {
                توقف.
            }
            لكل (عدد_صحيح ع = 0. ع < 10. ع + 1) {
                أكمل.
            }
            إرجع.
        }
    "});
    let NodeKind::FunctionDef { body, .. } = &declarations[0].kind else {
        panic!("expected a function definition");
    };
    let NodeKind::Block { statements } = &body.kind else {
        panic!("expected a block body");
    };
    assert_eq!(statements.len(), 4);
    assert!(matches!(
        statements[0].kind,
        NodeKind::If {
            else_branch: Some(_),
            ..
        }
    ));
    assert!(matches!(statements[1].kind, NodeKind::While { .. }));
    assert!(matches!(
        statements[2].kind,
        NodeKind::For {
            initializer: Some(_),
            condition: Some(_),
            increment: Some(_),
            ..
        }
    ));
    assert!(matches!(statements[3].kind, NodeKind::Return { value: None }));
}

#[test]
fn for_header_parts_are_optional() {
    let declarations = parse_ok("فراغ س() { لكل (. . ) { توقف. } }");
    let NodeKind::FunctionDef { body, .. } = &declarations[0].kind else {
        panic!();
    };
    let NodeKind::Block { statements } = &body.kind else {
        panic!();
    };
    assert!(matches!(
        statements[0].kind,
        NodeKind::For {
            initializer: None,
            condition: None,
            increment: None,
            ..
        }
    ));
}

#[test]
fn missing_terminator_recovers_at_next_declaration() {
    let (program, had_error, diagnostic_count) = parse(indoc! {"
        اجمع(1
        عدد_صحيح س = 2.
    "});
    assert!(had_error);
    assert!(diagnostic_count >= 1);
    let NodeKind::Program { declarations } = program.kind else {
        panic!();
    };
    // The bad statement is dropped; the declaration after it survives.
    assert!(declarations
        .iter()
        .any(|node| matches!(&node.kind, NodeKind::VarDecl { name, .. } if name == "س")));
}

#[test]
fn lexical_errors_surface_through_the_parser() {
    // An unterminated string, then a valid statement: the parser reports
    // the lexical error, keeps going, and still builds the program.
    let (program, had_error, _) = parse("\"abc\n42.");
    assert!(had_error);
    let NodeKind::Program { declarations } = program.kind else {
        panic!();
    };
    assert_eq!(declarations.len(), 1);
    assert!(matches!(declarations[0].kind, NodeKind::ExprStmt { .. }));
}

#[test]
fn spans_cover_their_nodes() {
    let declarations = parse_ok("عدد_صحيح س = 1 + 2.");
    let declaration = &declarations[0];
    assert_eq!(declaration.span.start.line, 1);
    assert_eq!(declaration.span.start.column, 1);
    assert!(declaration.span.end.column > declaration.span.start.column);
    assert!(declaration.span.start <= declaration.span.end);
}

#[test]
fn reserved_keywords_are_rejected_for_now() {
    let (_, had_error, _) = parse("اختر (س) { }.");
    assert!(had_error);
}
