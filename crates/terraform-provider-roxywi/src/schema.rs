// Schema construction shorthands

use std::collections::HashMap;

use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};

pub fn string() -> AttributeType {
    AttributeType::String
}

pub fn number() -> AttributeType {
    AttributeType::Number
}

pub fn bool() -> AttributeType {
    AttributeType::Bool
}

pub fn string_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}

fn attribute(attr_type: AttributeType, description: &str, constraint: AttributeConstraint) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

pub fn required(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, description, AttributeConstraint::Required)
}

pub fn optional(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, description, AttributeConstraint::Optional)
}

pub fn computed(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, description, AttributeConstraint::Computed)
}

/// Optional with a provider-filled default.
pub fn defaulted(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, description, AttributeConstraint::OptionalComputed)
}

pub fn sensitive(attribute: Attribute) -> Attribute {
    Attribute {
        sensitive: true,
        ..attribute
    }
}

pub fn block(description: &str, attributes: HashMap<String, Attribute>) -> Block {
    Block {
        version: 1,
        description: Description::plain(description),
        attributes,
        ..Default::default()
    }
}

pub fn with_blocks(block: Block, blocks: HashMap<String, NestedBlock>) -> Block {
    Block { blocks, ..block }
}

pub fn list_of(block: Block) -> NestedBlock {
    NestedBlock::List(block)
}

/// Set blocks; single-element ones are capped at one entry by validation.
pub fn set_of(block: Block) -> NestedBlock {
    NestedBlock::Set(block)
}

/// Adds the computed `id` every resource and data source carries.
pub fn with_id(mut block: Block) -> Schema {
    block
        .attributes
        .entry("id".to_owned())
        .or_insert_with(|| computed(string(), "Identifier assigned by Roxy-WI"));
    Schema { version: 1, block }
}

/// Shared description for the `action` attribute of config sections.
pub const ACTION: &str = "What to do after saving the config: save, reload or restart";

#[cfg(test)]
mod tests {
    use tf_provider::map;

    use super::*;

    #[test]
    fn id_is_added_once() {
        let schema = with_id(block(
            "test",
            map! { "name" => required(string(), "Name") },
        ));
        assert_eq!(schema.block.attributes.len(), 2);
        assert!(matches!(
            schema.block.attributes["id"].constraint,
            AttributeConstraint::Computed
        ));
    }

    #[test]
    fn sensitive_keeps_constraint() {
        let attr = sensitive(optional(string(), "Password"));
        assert!(attr.sensitive);
        assert!(matches!(attr.constraint, AttributeConstraint::Optional));
    }
}
