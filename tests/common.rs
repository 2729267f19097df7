//! Common test utilities for building form graphs and value maps.
use katachi::prelude::*;
use katachi::tree::NodeRef;

/// An unsaved container with a fresh identity.
#[allow(dead_code)]
pub fn container(
    form_id: FormId,
    kind: ContainerKind,
    attachment: Attachment,
    order: i32,
) -> ContainerNode {
    NewContainer::new(kind, attachment, order).into_node(ContainerId::fresh(), form_id)
}

/// An unsaved field with a fresh identity; its element id and label equal its name.
#[allow(dead_code)]
pub fn field(
    form_id: FormId,
    field_type: &str,
    name: &str,
    attachment: Attachment,
    order: i32,
) -> FieldNode {
    NewField::new(field_type, name, attachment, order).into_node(FieldId::fresh(), form_id)
}

#[allow(dead_code)]
pub fn values(pairs: &[(&str, FieldValue)]) -> ValueMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// A stored two-page order form exercising every kind of link.
///
/// ```text
/// page "Customer"
///   row
///     column: name
///     column: subscribe, email (shown when subscribe is checked)
/// page "Items"
///   items (repeater)
///     card (shown when name is filled or subscribe is checked)
///       item_name
///     item_qty (hidden while item_name is empty)
/// ```
#[allow(dead_code)]
pub struct SampleForm {
    pub form_id: FormId,
    pub customer_page: PageId,
    pub items_page: PageId,
    pub row: ContainerId,
    pub left: ContainerId,
    pub right: ContainerId,
    pub item_card: ContainerId,
    pub name: FieldId,
    pub subscribe: FieldId,
    pub email: FieldId,
    pub items: FieldId,
    pub item_name: FieldId,
    pub item_qty: FieldId,
}

#[allow(dead_code)]
pub fn sample_form(store: &mut MemoryStore) -> SampleForm {
    let mut form = NewForm::template("Order");
    form.settings = serde_json::json!({ "theme": "dark" });
    let form_id = store.create_form(form).unwrap();
    let customer_page = store
        .create_page(form_id, NewPage::new("Customer", 0))
        .unwrap();
    let items_page = store.create_page(form_id, NewPage::new("Items", 1)).unwrap();

    let row = store
        .create_container(
            form_id,
            NewContainer::new(ContainerKind::Row, Attachment::Page(customer_page), 0),
        )
        .unwrap();
    let left = store
        .create_container(
            form_id,
            NewContainer::new(ContainerKind::Column, Attachment::Container(row), 0),
        )
        .unwrap();
    let right = store
        .create_container(
            form_id,
            NewContainer::new(ContainerKind::Column, Attachment::Container(row), 1),
        )
        .unwrap();

    let name = store
        .create_field(
            form_id,
            NewField::new("text", "name", Attachment::Container(left), 0),
        )
        .unwrap();
    let subscribe = store
        .create_field(
            form_id,
            NewField::new("checkbox", "subscribe", Attachment::Container(right), 0),
        )
        .unwrap();
    let email = store
        .create_field(
            form_id,
            NewField::new("email", "email", Attachment::Container(right), 1).with_logic(
                RuleExpression::flat(
                    Action::Show,
                    MatchMode::All,
                    vec![Condition::on_field(subscribe, Operator::Checked, FieldValue::Null)],
                ),
            ),
        )
        .unwrap();
    let items = store
        .create_field(
            form_id,
            NewField::new("repeater", "items", Attachment::Page(items_page), 0),
        )
        .unwrap();

    let mut card = NewContainer::new(ContainerKind::Card, Attachment::Field(items), 0);
    card.conditional_logic = Some(RuleExpression::grouped(
        Action::Show,
        MatchMode::Any,
        vec![
            RuleGroup::new(
                MatchMode::All,
                vec![Condition::on_field(name, Operator::IsNotEmpty, FieldValue::Null)],
            ),
            RuleGroup::new(
                MatchMode::All,
                vec![Condition::on_element("subscribe", Operator::Checked, FieldValue::Null)],
            ),
        ],
    ));
    let item_card = store.create_container(form_id, card).unwrap();

    let item_name = store
        .create_field(
            form_id,
            NewField::new("text", "item_name", Attachment::Container(item_card), 0),
        )
        .unwrap();
    let item_qty = store
        .create_field(
            form_id,
            NewField::new("number", "item_qty", Attachment::Field(items), 1).with_logic(
                RuleExpression::flat(
                    Action::Hide,
                    MatchMode::All,
                    vec![Condition::on_field(item_name, Operator::IsEmpty, FieldValue::Null)],
                ),
            ),
        )
        .unwrap();

    SampleForm {
        form_id,
        customer_page,
        items_page,
        row,
        left,
        right,
        item_card,
        name,
        subscribe,
        email,
        items,
        item_name,
        item_qty,
    }
}

/// A stored single-page form whose containers nest `depth` levels deep, with one
/// field in the innermost container. Returns the containers outermost first.
#[allow(dead_code)]
pub fn nested_chain(store: &mut MemoryStore, depth: usize) -> (FormId, Vec<ContainerId>) {
    let form_id = store.create_form(NewForm::new("Chain")).unwrap();
    let mut chain = Vec::with_capacity(depth);
    let mut parent = Attachment::Root;
    for _ in 0..depth {
        let id = store
            .create_container(
                form_id,
                NewContainer::new(ContainerKind::Section, parent, 0),
            )
            .unwrap();
        chain.push(id);
        parent = Attachment::Container(id);
    }
    store
        .create_field(form_id, NewField::new("text", "leaf", parent, 0))
        .unwrap();
    (form_id, chain)
}

/// An identity-free rendering of every forest of a graph, repeater sub-trees
/// included, one line per node indented by depth.
#[allow(dead_code)]
pub fn outline(graph: &FormGraph) -> Vec<String> {
    let builder = TreeBuilder::new(graph.form.id, &graph.containers, &graph.fields);
    let mut lines = Vec::new();
    for page in graph.forests() {
        lines.push(format!(
            "page {}",
            page.page.map_or("-", |p| p.title.as_str())
        ));
        outline_level(&builder, &page.nodes, 1, &mut lines);
    }
    lines
}

fn outline_level(builder: &TreeBuilder, nodes: &[TreeNode], depth: usize, lines: &mut Vec<String>) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        match node.node {
            NodeRef::Element(c) => lines.push(format!("{}{} #{}", indent, c.kind, c.order)),
            NodeRef::Field(f) => {
                lines.push(format!("{}{}:{} #{}", indent, f.field_type, f.name, f.order));
                let owned = builder.repeater_forest(f.id);
                outline_level(builder, &owned, depth + 1, lines);
            }
        }
        outline_level(builder, &node.children, depth + 1, lines);
    }
}

/// Names of the fields of a forest in depth-first order.
#[allow(dead_code)]
pub fn field_names(forest: &[TreeNode]) -> Vec<String> {
    let mut names = Vec::new();
    for node in forest {
        if let NodeRef::Field(f) = node.node {
            names.push(f.name.clone());
        }
        names.extend(field_names(&node.children));
    }
    names
}
