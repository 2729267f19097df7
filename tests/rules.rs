//! Tests for rule expressions: shapes, operator table, target resolution and traces.
mod common;
use common::*;
use katachi::prelude::*;
use katachi::rules::operators::{apply, missing_value_policy, parse_datetime};
use serde_json::json;

fn text(s: &str) -> FieldValue {
    FieldValue::from(s)
}

fn flat(action: Action, mode: MatchMode, conditions: Vec<Condition>) -> RuleExpression {
    RuleExpression::flat(action, mode, conditions)
}

#[test]
fn test_equals_on_list_is_membership() {
    let actual = FieldValue::from(vec!["red", "blue"]);
    assert!(apply(&Operator::Equals, &actual, &text("blue")));
    assert!(!apply(&Operator::Equals, &actual, &text("green")));
    assert!(apply(&Operator::NotEquals, &actual, &text("green")));
}

#[test]
fn test_equals_is_loose() {
    assert!(apply(&Operator::Equals, &text("10"), &FieldValue::from(10)));
    assert!(apply(&Operator::Equals, &text("1.50"), &text("1.5")));
    assert!(!apply(&Operator::Equals, &text("abc"), &text("ABC")));
    assert!(apply(&Operator::Equals, &FieldValue::Bool(true), &text("true")));
}

#[test]
fn test_contains_joins_lists_with_commas() {
    let actual = FieldValue::from(vec!["a", "b"]);
    assert!(apply(&Operator::Contains, &actual, &text("a,b")));
    assert!(apply(&Operator::Contains, &text("hello world"), &text("lo w")));
    assert!(apply(&Operator::NotContains, &text("hello"), &text("bye")));
}

#[test]
fn test_comparisons_prefer_numbers() {
    // As strings "10" < "9"; numerically it is greater.
    assert!(apply(&Operator::GreaterThan, &text("10"), &text("9")));
    assert!(apply(&Operator::LessThanOrEqual, &FieldValue::from(3), &text("3")));
    assert!(!apply(&Operator::GreaterThan, &text("abc"), &text("9")));
}

#[test]
fn test_comparisons_fall_back_to_dates() {
    assert!(apply(&Operator::GreaterThan, &text("2024-03-01"), &text("2024-02-28")));
    assert!(apply(&Operator::After, &text("03/01/2024"), &text("2024-02-28")));
    assert!(apply(&Operator::Before, &text("01.02.2024"), &text("2024/02/02")));
    assert!(apply(&Operator::AfterOrEqual, &text("2024-02-28T10:00"), &text("2024-02-28")));
    assert!(apply(&Operator::LessThan, &text("09:30"), &text("17:00")));
    assert!(!apply(&Operator::After, &text("soon"), &text("2024-02-28")));
}

#[test]
fn test_parse_datetime_formats() {
    for raw in [
        "2024-02-28T10:15:00Z",
        "2024-02-28 10:15:00",
        "2024-02-28T10:15",
        "2024-02-28",
        "2024/02/28",
        "02/28/2024",
        "28.02.2024",
        "10:15",
    ] {
        assert!(parse_datetime(raw).is_some(), "failed to parse {}", raw);
    }
    assert!(parse_datetime("").is_none());
    assert!(parse_datetime("next tuesday").is_none());
}

#[test]
fn test_is_empty() {
    assert!(apply(&Operator::IsEmpty, &text(""), &FieldValue::Null));
    assert!(apply(&Operator::IsEmpty, &FieldValue::List(vec![]), &FieldValue::Null));
    assert!(apply(&Operator::IsEmpty, &FieldValue::Null, &FieldValue::Null));
    assert!(apply(&Operator::IsNotEmpty, &FieldValue::from(0), &FieldValue::Null));
}

#[test]
fn test_in_splits_expected_on_commas() {
    assert!(apply(&Operator::In, &text("b"), &text("a, b ,c")));
    assert!(!apply(&Operator::In, &text("d"), &text("a,b,c")));
    assert!(apply(&Operator::In, &FieldValue::from(vec!["x", "c"]), &text("a,b,c")));
    assert!(apply(&Operator::In, &FieldValue::from(2), &FieldValue::from(vec![1, 2])));
    assert!(apply(&Operator::NotIn, &FieldValue::from(vec!["x", "y"]), &text("a,b")));
}

#[test]
fn test_checked_readings() {
    assert!(apply(&Operator::Checked, &text("YES"), &FieldValue::Null));
    assert!(apply(&Operator::Checked, &text("On"), &FieldValue::Null));
    assert!(apply(&Operator::Checked, &FieldValue::from(1), &FieldValue::Null));
    assert!(apply(&Operator::Checked, &FieldValue::Bool(true), &FieldValue::Null));
    assert!(!apply(&Operator::Checked, &FieldValue::from(0), &FieldValue::Null));
    assert!(apply(&Operator::Unchecked, &FieldValue::from(0), &FieldValue::Null));
    assert!(apply(&Operator::Unchecked, &text("no"), &FieldValue::Null));
}

#[test]
fn test_unknown_operator_is_false_and_round_trips() {
    let op = Operator::parse("matches_regex");
    assert_eq!(op, Operator::Unknown("matches_regex".to_string()));
    assert!(!apply(&op, &text("x"), &text("x")));
    assert!(!missing_value_policy(&op));
    assert_eq!(serde_json::to_value(&op).unwrap(), json!("matches_regex"));
}

#[test]
fn test_missing_values_follow_operator_policy() {
    let fields: Vec<FieldNode> = Vec::new();
    let index = FieldIndex::new(&fields);
    let empty = ValueMap::new();
    let check = |op: Operator| {
        let expr = flat(
            Action::Show,
            MatchMode::All,
            vec![Condition::on_element("ghost", op, "x")],
        );
        evaluate(Some(&expr), &empty, &index)
    };

    assert!(check(Operator::IsEmpty));
    assert!(check(Operator::NotEquals));
    assert!(check(Operator::NotContains));
    assert!(check(Operator::NotIn));
    assert!(check(Operator::Unchecked));
    assert!(!check(Operator::Equals));
    assert!(!check(Operator::IsNotEmpty));
    assert!(!check(Operator::GreaterThan));
    assert!(!check(Operator::Checked));
}

#[test]
fn test_unresolved_field_target_follows_missing_policy() {
    let form_id = FormId::fresh();
    let fields = vec![field(form_id, "text", "city", Attachment::Root, 0)];
    let index = FieldIndex::new(&fields);
    let data = values(&[("city", text("Oslo"))]);

    let ghost = FieldId::fresh();
    let not_equals = flat(
        Action::Show,
        MatchMode::All,
        vec![Condition::on_field(ghost, Operator::NotEquals, "Oslo")],
    );
    let equals = flat(
        Action::Show,
        MatchMode::All,
        vec![Condition::on_field(ghost, Operator::Equals, "Oslo")],
    );
    assert!(evaluate(Some(&not_equals), &data, &index));
    assert!(!evaluate(Some(&equals), &data, &index));
}

#[test]
fn test_hide_action_inverts_the_match() {
    let fields: Vec<FieldNode> = Vec::new();
    let index = FieldIndex::new(&fields);
    let expr = flat(
        Action::Hide,
        MatchMode::All,
        vec![Condition::on_element("agree", Operator::Checked, FieldValue::Null)],
    );

    assert!(!evaluate(Some(&expr), &values(&[("agree", text("on"))]), &index));
    assert!(evaluate(Some(&expr), &values(&[("agree", text("off"))]), &index));
}

#[test]
fn test_grouped_expressions_combine_groups() {
    let fields: Vec<FieldNode> = Vec::new();
    let index = FieldIndex::new(&fields);
    let expr = RuleExpression::grouped(
        Action::Show,
        MatchMode::Any,
        vec![
            RuleGroup::new(
                MatchMode::All,
                vec![
                    Condition::on_element("a", Operator::Equals, 1),
                    Condition::on_element("b", Operator::Equals, 2),
                ],
            ),
            RuleGroup::new(
                MatchMode::All,
                vec![Condition::on_element("c", Operator::IsNotEmpty, FieldValue::Null)],
            ),
        ],
    );

    let both = values(&[("a", FieldValue::from(1)), ("b", FieldValue::from(2))]);
    let half = values(&[("a", FieldValue::from(1)), ("b", FieldValue::from(3))]);
    let second = values(&[("c", text("filled"))]);
    assert!(evaluate(Some(&expr), &both, &index));
    assert!(!evaluate(Some(&expr), &half, &index));
    assert!(evaluate(Some(&expr), &second, &index));
}

#[test]
fn test_empty_and_malformed_expressions_are_visible() {
    let fields: Vec<FieldNode> = Vec::new();
    let index = FieldIndex::new(&fields);
    let empty = ValueMap::new();

    assert!(evaluate(None, &empty, &index));
    let no_conditions = flat(Action::Hide, MatchMode::All, vec![]);
    assert!(evaluate(Some(&no_conditions), &empty, &index));
    let no_groups = RuleExpression::grouped(Action::Hide, MatchMode::All, vec![]);
    assert!(evaluate(Some(&no_groups), &empty, &index));

    let malformed = RuleExpression::from_json(json!({ "when": "always", "then": "hide" }));
    assert!(matches!(malformed, RuleExpression::Unrecognized(_)));
    assert!(evaluate(Some(&malformed), &empty, &index));

    for expr in [&no_conditions, &no_groups, &malformed] {
        assert!(expr.is_vacuous());
    }
    let all_empty = RuleExpression::grouped(
        Action::Hide,
        MatchMode::All,
        vec![RuleGroup::new(MatchMode::Any, vec![])],
    );
    assert!(all_empty.is_vacuous());
    assert!(evaluate(Some(&all_empty), &empty, &index));
}

#[test]
fn test_empty_groups_are_skipped() {
    let fields: Vec<FieldNode> = Vec::new();
    let index = FieldIndex::new(&fields);
    let expr = RuleExpression::grouped(
        Action::Show,
        MatchMode::All,
        vec![
            RuleGroup::new(MatchMode::All, vec![]),
            RuleGroup::new(
                MatchMode::All,
                vec![Condition::on_element("x", Operator::Equals, "1")],
            ),
        ],
    );
    assert!(evaluate(Some(&expr), &values(&[("x", text("1"))]), &index));
    assert!(!evaluate(Some(&expr), &values(&[("x", text("2"))]), &index));
}

#[test]
fn test_payload_shapes_parse() {
    let legacy = RuleExpression::from_json(json!({
        "action": "hide",
        "match": "or",
        "conditions": [{ "targetElementId": "x", "operator": "equals", "value": "1" }]
    }));
    match legacy {
        RuleExpression::Flat(rules) => {
            assert_eq!(rules.action, Action::Hide);
            assert_eq!(rules.match_mode, MatchMode::Any);
            assert_eq!(rules.conditions[0].target_element_id.as_deref(), Some("x"));
        }
        other => panic!("expected flat rules, got {:?}", other),
    }

    let target = FieldId::fresh();
    let grouped = RuleExpression::from_json(json!({
        "groups_match": "all",
        "groups": [{
            "match": "any",
            "conditions": [
                { "targetFieldId": target.to_string(), "operator": "in", "value": ["a", "b"] },
                { "targetFieldId": "", "targetElementId": "legacy", "operator": "checked" }
            ]
        }]
    }));
    match grouped {
        RuleExpression::Grouped(rules) => {
            assert_eq!(rules.action, Action::Show);
            assert_eq!(rules.groups_match, MatchMode::All);
            let conditions = &rules.groups[0].conditions;
            assert_eq!(conditions[0].target_field_id, Some(target));
            assert_eq!(conditions[0].value, FieldValue::from(vec!["a", "b"]));
            assert_eq!(conditions[1].target_field_id, None);
            assert_eq!(conditions[1].operator, Operator::Checked);
        }
        other => panic!("expected grouped rules, got {:?}", other),
    }
}

#[test]
fn test_object_condition_value_keeps_the_rule() {
    let fields: Vec<FieldNode> = Vec::new();
    let index = FieldIndex::new(&fields);
    let expr = RuleExpression::from_json(json!({
        "action": "hide",
        "match": "any",
        "conditions": [
            { "targetElementId": "a", "operator": "equals", "value": "x" },
            { "targetElementId": "a", "operator": "equals", "value": { "k": 1 } }
        ]
    }));
    match &expr {
        RuleExpression::Flat(rules) => {
            assert_eq!(rules.conditions.len(), 2);
            assert_eq!(rules.conditions[1].value, text("{\"k\":1}"));
        }
        other => panic!("expected flat rules, got {:?}", other),
    }
    assert!(!expr.is_vacuous());
    assert!(!evaluate(Some(&expr), &values(&[("a", text("x"))]), &index));
    assert!(evaluate(Some(&expr), &values(&[("a", text("y"))]), &index));

    let nested: FieldValue = serde_json::from_value(json!([1, { "k": null }, null])).unwrap();
    assert_eq!(
        nested,
        FieldValue::List(vec![
            FieldValue::Number(1.0),
            text("{\"k\":null}"),
            FieldValue::Null
        ])
    );
}

#[test]
fn test_grouped_rules_serialize_in_camel_case() {
    let expr = RuleExpression::grouped(
        Action::Hide,
        MatchMode::Any,
        vec![RuleGroup::new(
            MatchMode::All,
            vec![Condition::on_element("x", Operator::NotIn, "a,b")],
        )],
    );
    let value = serde_json::to_value(&expr).unwrap();
    assert_eq!(
        value,
        json!({
            "action": "hide",
            "groupsMatch": "any",
            "groups": [{
                "match": "all",
                "conditions": [{ "targetElementId": "x", "operator": "not_in", "value": "a,b" }]
            }]
        })
    );
    assert_eq!(RuleExpression::from_json(value), expr);
}

#[test]
fn test_evaluate_by_name_resolves_field_names() {
    let form_id = FormId::fresh();
    let mut qty = field(form_id, "number", "qty", Attachment::Root, 0);
    qty.element_id = "el-7".to_string();
    let fields = vec![qty.clone()];
    let index = FieldIndex::new(&fields);

    let by_id = flat(
        Action::Show,
        MatchMode::All,
        vec![Condition::on_field(qty.id, Operator::GreaterThan, 3)],
    );
    let by_element = flat(
        Action::Show,
        MatchMode::All,
        vec![Condition::on_element("el-7", Operator::GreaterThan, 3)],
    );
    let by_name = values(&[("qty", FieldValue::from(5))]);
    let by_element_id = values(&[("el-7", FieldValue::from(5))]);

    assert!(evaluate(Some(&by_id), &by_element_id, &index));
    assert!(!evaluate(Some(&by_id), &by_name, &index));
    assert!(evaluate_by_name(Some(&by_id), &by_name, &index));
    assert!(evaluate_by_name(Some(&by_element), &by_name, &index));
    assert!(!evaluate_by_name(Some(&by_id), &by_element_id, &index));
}

#[test]
fn test_explain_reports_values_seen() {
    let fields: Vec<FieldNode> = Vec::new();
    let index = FieldIndex::new(&fields);
    let expr = flat(
        Action::Show,
        MatchMode::All,
        vec![
            Condition::on_element("agree", Operator::Checked, FieldValue::Null),
            Condition::on_element("age", Operator::GreaterThan, 17),
        ],
    );
    let data = values(&[("agree", text("yes")), ("age", FieldValue::from(20))]);
    let verdict = RuleEvaluator::new(katachi::rules::ByElementId::new(&index), &data)
        .explain(Some(&expr));

    assert!(verdict.visible);
    assert_eq!(
        verdict.reason(),
        "visible (show rule matched): $agree (was \"yes\") checked AND $age (was 20) greater_than 17"
    );
}

#[test]
fn test_explain_parenthesizes_nested_groups() {
    let fields: Vec<FieldNode> = Vec::new();
    let index = FieldIndex::new(&fields);
    let expr = RuleExpression::grouped(
        Action::Show,
        MatchMode::All,
        vec![
            RuleGroup::new(
                MatchMode::Any,
                vec![
                    Condition::on_element("a", Operator::Equals, 1),
                    Condition::on_element("b", Operator::Equals, 2),
                ],
            ),
            RuleGroup::new(
                MatchMode::All,
                vec![Condition::on_element("c", Operator::IsEmpty, FieldValue::Null)],
            ),
        ],
    );
    let empty = ValueMap::new();
    let verdict = RuleEvaluator::new(katachi::rules::ByElementId::new(&index), &empty)
        .explain(Some(&expr));

    assert!(!verdict.visible);
    assert_eq!(
        verdict.reason(),
        "hidden (show rule did not match): ($a (missing) equals 1 OR $b (missing) equals 2) AND $c (missing) is_empty"
    );
    assert_eq!(
        verdict.visible,
        evaluate(Some(&expr), &empty, &index),
        "explain and evaluate must agree"
    );
}

#[test]
fn test_explain_without_conditions() {
    let fields: Vec<FieldNode> = Vec::new();
    let index = FieldIndex::new(&fields);
    let empty = ValueMap::new();
    let verdict =
        RuleEvaluator::new(katachi::rules::ByElementId::new(&index), &empty).explain(None);
    assert!(verdict.visible);
    assert_eq!(verdict.reason(), "visible: no conditions");
}

#[test]
fn test_remap_targets_rewrites_ids_only() {
    let old = FieldId::fresh();
    let new = FieldId::fresh();
    let untouched = FieldId::fresh();
    let expr = flat(
        Action::Show,
        MatchMode::Any,
        vec![
            Condition::on_field(old, Operator::Equals, "x"),
            Condition::on_field(untouched, Operator::Equals, "y"),
            Condition::on_element("legacy", Operator::Checked, FieldValue::Null),
        ],
    );
    let original = expr.clone();
    let mut map = FieldIdMap::new();
    map.insert(old, new);

    let remapped = remap_targets(&expr, &map);
    assert_eq!(expr, original, "input must not change");
    let targets: Vec<Option<FieldId>> = remapped.conditions().map(|c| c.target_field_id).collect();
    assert_eq!(targets, vec![Some(new), Some(untouched), None]);
    assert_eq!(
        remapped.conditions().nth(2).unwrap().target_element_id.as_deref(),
        Some("legacy")
    );
    assert_eq!(remap_targets(&remapped, &map), remapped);
    assert_eq!(expr.unmapped_targets(&map), vec![untouched]);

    let raw = RuleExpression::Unrecognized(json!([1, 2, 3]));
    assert_eq!(remap_targets(&raw, &map), raw);
}

#[test]
fn test_target_field_ids_are_unique() {
    let a = FieldId::fresh();
    let b = FieldId::fresh();
    let expr = RuleExpression::grouped(
        Action::Show,
        MatchMode::All,
        vec![
            RuleGroup::new(
                MatchMode::All,
                vec![
                    Condition::on_field(a, Operator::Equals, 1),
                    Condition::on_field(b, Operator::Equals, 1),
                ],
            ),
            RuleGroup::new(MatchMode::All, vec![Condition::on_field(a, Operator::IsEmpty, FieldValue::Null)]),
        ],
    );
    assert_eq!(expr.target_field_ids(), vec![a, b]);
}

#[test]
fn test_values_from_json() {
    let map = katachi::rules::values_from_json(json!({
        "name": "Ada",
        "age": 36,
        "tags": ["x", "y"],
        "agree": true,
        "meta": { "k": 1 },
        "none": null
    }));
    assert_eq!(map["name"], text("Ada"));
    assert_eq!(map["age"], FieldValue::Number(36.0));
    assert_eq!(map["tags"], FieldValue::from(vec!["x", "y"]));
    assert_eq!(map["agree"], FieldValue::Bool(true));
    assert_eq!(map["meta"], text("{\"k\":1}"));
    assert_eq!(map["none"], FieldValue::Null);
    assert!(katachi::rules::values_from_json(json!([1, 2])).is_empty());
}

#[test]
fn test_field_value_display() {
    assert_eq!(format!("{}", FieldValue::from(42)), "42");
    assert_eq!(format!("{}", FieldValue::from(1.5)), "1.5");
    assert_eq!(format!("{}", text("hi")), "\"hi\"");
    assert_eq!(format!("{}", FieldValue::from(vec![1, 2])), "[1, 2]");
    assert_eq!(format!("{}", FieldValue::Null), "null");
}

#[test]
fn test_rules_on_a_stored_form() {
    let mut store = MemoryStore::new();
    let sample = sample_form(&mut store);
    let graph = FormGraph::load(&store, sample.form_id).unwrap();
    let index = graph.field_index();
    let email = graph.fields.iter().find(|f| f.id == sample.email).unwrap();
    let card = graph
        .containers
        .iter()
        .find(|c| c.id == sample.item_card)
        .unwrap();

    let ticked = values(&[("subscribe", text("yes"))]);
    let blank = values(&[("subscribe", FieldValue::Bool(false)), ("name", text(""))]);
    assert!(evaluate(email.conditional_logic.as_ref(), &ticked, &index));
    assert!(!evaluate(email.conditional_logic.as_ref(), &blank, &index));
    assert!(evaluate(card.conditional_logic.as_ref(), &ticked, &index));
    assert!(!evaluate(card.conditional_logic.as_ref(), &blank, &index));
}
