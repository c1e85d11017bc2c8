//! Unit tests for the value and operator model and supporting types.
mod common;
use scopeflow::condition::{Comparison, Value};
use scopeflow::error::{NavigationError, ScopeError};
use scopeflow::prelude::*;

fn apply(op: Operator, actual: impl Into<Value>, expected: impl Into<Value>) -> bool {
    op.apply(&actual.into(), &expected.into()).outcome
}

#[test]
fn test_value_display() {
    assert_eq!(format!("{}", Value::Number(42.0)), "42");
    assert_eq!(format!("{}", Value::Number(2.5)), "2.5");
    assert_eq!(format!("{}", Value::Bool(true)), "true");
    assert_eq!(format!("{}", Value::from("gold")), "\"gold\"");
    assert_eq!(format!("{}", Value::from(vec![1.0, 2.0])), "[1,2]");
    assert_eq!(format!("{}", Value::Absent), "absent");
}

#[test]
fn test_authored_numeric_strings_are_coerced() {
    assert_eq!(Value::from("50000").coerce_authored(), Value::Number(50000.0));
    assert_eq!(Value::from(" 2.5 ").coerce_authored(), Value::Number(2.5));
    assert_eq!(Value::from("12abc").coerce_authored(), Value::from("12abc"));
    assert_eq!(Value::from("").coerce_authored(), Value::from(""));
    assert_eq!(Value::from("NaN").coerce_authored(), Value::from("NaN"));
    assert_eq!(
        Value::from(vec!["1", "x"]).coerce_authored(),
        Value::Array(vec![Value::Number(1.0), Value::from("x")])
    );
}

#[test]
fn test_condition_value_is_coerced_on_read() {
    let tree: ConditionTree = serde_json::from_str(
        r#"{ "source": "FORM_DATA", "field": "income", "operator": "GT", "value": "50000" }"#,
    )
    .unwrap();
    match tree {
        ConditionTree::Leaf(scopeflow::condition::Condition::Field(leaf)) => {
            assert_eq!(leaf.value, Value::Number(50000.0));
        }
        other => panic!("Expected a field leaf, got {:?}", other),
    }
}

#[test]
fn test_exists_and_not_exists_are_complements() {
    let inputs = vec![
        Value::Absent,
        Value::from(""),
        Value::Number(0.0),
        Value::Bool(false),
        Value::from("x"),
        Value::Array(vec![]),
    ];
    for input in inputs {
        let exists = Operator::Exists.apply(&input, &Value::Absent).outcome;
        let not_exists = Operator::NotExists.apply(&input, &Value::Absent).outcome;
        assert_ne!(exists, not_exists, "input {:?}", input);
    }
    assert!(!apply(Operator::Exists, Value::Absent, Value::Absent));
    assert!(!apply(Operator::Exists, "", Value::Absent));
    assert!(apply(Operator::Exists, 0.0, Value::Absent));
    assert!(apply(Operator::Exists, false, Value::Absent));
}

#[test]
fn test_null_json_reads_as_absent() {
    let value: Value = serde_json::from_str("null").unwrap();
    assert_eq!(value, Value::Absent);
    assert!(!Operator::Exists.apply(&value, &Value::Absent).outcome);
}

#[test]
fn test_in_and_not_in_are_complements() {
    let list = Value::from(vec!["gold", "platinum"]);
    for actual in [
        Value::from("gold"),
        Value::from("silver"),
        Value::Number(1.0),
        Value::Absent,
    ] {
        let is_in = Operator::In.apply(&actual, &list).outcome;
        let not_in = Operator::NotIn.apply(&actual, &list).outcome;
        assert_ne!(is_in, not_in, "actual {:?}", actual);
    }
    assert!(apply(Operator::In, "gold", list.clone()));
    assert!(apply(Operator::NotIn, "silver", list));
}

#[test]
fn test_in_requires_array_operand() {
    let result = Operator::In.apply(&Value::from("gold"), &Value::from("gold"));
    assert!(!result.outcome);
    assert!(result.issue.unwrap().contains("array"));
}

#[test]
fn test_equality_never_coerces() {
    assert!(apply(Operator::Equals, 5.0, 5.0));
    assert!(!apply(Operator::Equals, "5", 5.0));
    assert!(apply(Operator::NotEquals, "5", 5.0));

    let mismatch = Operator::Equals.apply(&Value::from("5"), &Value::Number(5.0));
    assert!(mismatch.issue.unwrap().contains("type mismatch"));
}

#[test]
fn test_ordering_operators() {
    assert!(apply(Operator::Gt, 10.0, 5.0));
    assert!(!apply(Operator::Gt, 5.0, 5.0));
    assert!(apply(Operator::Gte, 5.0, 5.0));
    assert!(apply(Operator::Lt, 1.0, 5.0));
    assert!(apply(Operator::Lte, 5.0, 5.0));
    assert!(!apply(Operator::Lte, 6.0, 5.0));
}

#[test]
fn test_ordering_on_iso_dates() {
    assert!(apply(Operator::Gt, "2024-05-01", "2024-04-30"));
    assert!(apply(Operator::Lt, "2024-05-01T10:00:00Z", "2024-05-01T12:00:00+00:00"));
    assert!(apply(Operator::Gte, "2024-05-01T00:00:00", "2024-05-01"));
}

#[test]
fn test_ordering_incomparable_types_is_false_with_issue() {
    let cases: Vec<(Value, Value)> = vec![
        (Value::from("abc"), Value::from("def")),
        (Value::Bool(true), Value::Number(1.0)),
        (Value::Absent, Value::Number(1.0)),
        (Value::from("2024-01-01"), Value::Number(5.0)),
    ];
    for (actual, expected) in cases {
        let Comparison { outcome, issue } = Operator::Gt.apply(&actual, &expected);
        assert!(!outcome);
        assert!(issue.is_some());
    }
}

#[test]
fn test_contains() {
    assert!(apply(Operator::Contains, "Pune, Maharashtra", "Pune"));
    assert!(!apply(Operator::Contains, "Mumbai", "Pune"));
    assert!(apply(Operator::Contains, vec!["a", "b"], "b"));
    assert!(!apply(Operator::Contains, 42.0, "4"));
}

#[test]
fn test_large_integers_display_exactly() {
    assert_eq!(Value::Number(9_007_199_254_740_991.0).to_string(), "9007199254740991");
    assert_eq!(Value::Number(-42.0).to_string(), "-42");
    assert_eq!(Value::Number(1e19).to_string(), "10000000000000000000");
    assert_ne!(Value::Number(1.2345678901234567e19).to_string(), i64::MAX.to_string());
}

#[test]
fn test_contains_operand_keeps_authored_text() {
    let read = |json: &str| -> ConditionTree { serde_json::from_str(json).unwrap() };
    let ctx = |reference: &str| EvaluationContext::new().with_form("ref", reference);
    let evaluator = Evaluator::disabled();

    let long_id = read(
        r#"{ "source": "FORM_DATA", "field": "ref", "operator": "CONTAINS", "value": "12345678901234567890" }"#,
    );
    let evaluation = evaluator.evaluate_detailed(&long_id, &ctx("ACC-12345678901234567890"));
    assert!(evaluation.outcome);
    assert!(evaluation.reason().ends_with("CONTAINS \"12345678901234567890\""));

    let decimal = read(r#"{ "source": "FORM_DATA", "field": "ref", "operator": "CONTAINS", "value": "1.0" }"#);
    assert!(!evaluator.evaluate(&decimal, &ctx("v10")));
    assert!(evaluator.evaluate(&decimal, &ctx("v1.0.3")));

    // Numeric array elements are still found by their authored spelling.
    let tagged = read(r#"{ "source": "FORM_DATA", "field": "codes", "operator": "CONTAINS", "value": "5" }"#);
    let codes = EvaluationContext::new().with_form("codes", vec![3.0, 5.0]);
    assert!(evaluator.evaluate(&tagged, &codes));

    // Other operators still coerce.
    let gt = read(r#"{ "source": "FORM_DATA", "field": "n", "operator": "GT", "value": "1.0" }"#);
    assert!(evaluator.evaluate(&gt, &EvaluationContext::new().with_form("n", 2.0)));
}

#[test]
fn test_operator_wire_names() {
    let ops: Vec<Operator> =
        serde_json::from_str(r#"["EQUALS","NOT_EQUALS","GT","GTE","LT","LTE","IN","NOT_IN","CONTAINS","EXISTS","NOT_EXISTS"]"#)
            .unwrap();
    assert_eq!(ops.len(), 11);
    assert_eq!(ops[2], Operator::Gt);
    assert_eq!(ops[7], Operator::NotIn);
    assert_eq!(Operator::NotExists.to_string(), "NOT_EXISTS");
}

#[test]
fn test_trace_formatter_short_circuit() {
    let trace = EvaluationTrace::Group {
        operator: LogicalOperator::Or,
        children: vec![
            EvaluationTrace::Leaf {
                source: "$form.vip".to_string(),
                operator: Operator::Equals,
                actual: Value::Bool(true),
                expected: Value::Bool(true),
                outcome: true,
            },
            EvaluationTrace::NotEvaluated,
        ],
        outcome: true,
    };

    let formatted = TraceFormatter::format_trace(&trace);
    assert_eq!(formatted, "$form.vip (was true) EQUALS true");
}

#[test]
fn test_trace_formatter_nested_parentheses() {
    let leaf = |name: &str, outcome: bool| EvaluationTrace::Leaf {
        source: format!("$form.{}", name),
        operator: Operator::Exists,
        actual: Value::Bool(outcome),
        expected: Value::Absent,
        outcome,
    };
    let trace = EvaluationTrace::Group {
        operator: LogicalOperator::And,
        children: vec![
            leaf("a", true),
            EvaluationTrace::Group {
                operator: LogicalOperator::Or,
                children: vec![leaf("b", false), leaf("c", true)],
                outcome: true,
            },
        ],
        outcome: true,
    };

    assert_eq!(
        TraceFormatter::format_trace(&trace),
        "$form.a (was true) EXISTS AND ($form.b (was false) EXISTS OR $form.c (was true) EXISTS)"
    );
}

#[test]
fn test_scope_invariants() {
    assert!(ConfigScope::product("PL").validate().is_ok());
    assert!(ConfigScope::partner("PL", "P1").validate().is_ok());
    assert!(ConfigScope::branch("PL", "P1", "B7").validate().is_ok());

    assert_eq!(
        ConfigScope::product("").validate(),
        Err(ScopeError::MissingProductCode)
    );

    let mut partner = ConfigScope::partner("PL", "P1");
    partner.partner_code = None;
    assert_eq!(
        partner.validate(),
        Err(ScopeError::MissingPartnerCode(ScopeType::Partner))
    );

    let mut branch = ConfigScope::branch("PL", "P1", "B7");
    branch.branch_code = None;
    assert_eq!(branch.validate(), Err(ScopeError::MissingBranchCode));

    let mut product = ConfigScope::product("PL");
    product.partner_code = Some("P1".to_string());
    assert!(matches!(
        product.validate(),
        Err(ScopeError::UnexpectedCode { field: "partnerCode", .. })
    ));
}

#[test]
fn test_record_lifecycle() {
    assert!(RecordStatus::Draft.can_transition_to(RecordStatus::Active));
    assert!(RecordStatus::Active.can_transition_to(RecordStatus::Deprecated));
    assert!(!RecordStatus::Deprecated.can_transition_to(RecordStatus::Active));
    assert!(!RecordStatus::Draft.can_transition_to(RecordStatus::Deprecated));
    assert!(!RecordStatus::Active.can_transition_to(RecordStatus::Draft));
}

#[test]
fn test_error_display() {
    let err = NavigationError::UnknownScreen {
        flow_id: "pl-journey".to_string(),
        screen_id: "ghost".to_string(),
    };
    assert!(err.to_string().contains("ghost"));
    assert!(err.to_string().contains("pl-journey"));

    let err = ResolveError::NotFound {
        entity_id: "kyc".to_string(),
        product_code: "PL".to_string(),
        chain: vec![],
    };
    assert!(err.to_string().contains("no active PRODUCT-level configuration"));

    let err = RunnerError::Timeout(250);
    assert!(err.to_string().contains("250ms"));
}
