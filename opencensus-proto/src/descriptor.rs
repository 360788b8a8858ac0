//! Schema metadata for `opencensus/proto/resource/v1/resource.proto`.
//!
//! The descriptor is built and registered lazily, once per process, and
//! lives for the rest of it. Tooling that needs reflection can take the
//! encoded [`FileDescriptorSet`] from [`encoded_file_descriptor_set`].

use prost::Message;
use prost_types::{
    field_descriptor_proto::{Label, Type},
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet, FileOptions,
    MessageOptions,
};
use std::sync::OnceLock;
use tracing::debug;

pub const FILE_NAME: &str = "opencensus/proto/resource/v1/resource.proto";
pub const PACKAGE: &str = "opencensus.proto.resource.v1";

struct Registry {
    file: FileDescriptorProto,
    encoded: Vec<u8>,
}

pub fn file_descriptor() -> &'static FileDescriptorProto {
    &registry().file
}

/// The file descriptor, wrapped in a `FileDescriptorSet` and encoded.
pub fn encoded_file_descriptor_set() -> &'static [u8] {
    &registry().encoded
}

/// The descriptor of `opencensus.proto.resource.v1.Resource`.
pub fn resource() -> &'static DescriptorProto {
    &registry().file.message_type[0]
}

/// Resolves a fully qualified message name, with or without the leading
/// `.` used in type references.
pub fn lookup(full_name: &str) -> Option<&'static DescriptorProto> {
    let name = full_name.strip_prefix('.').unwrap_or(full_name);
    let name = name.strip_prefix(PACKAGE)?.strip_prefix('.')?;

    let mut segments = name.split('.');
    let first = segments.next()?;
    let mut message = registry()
        .file
        .message_type
        .iter()
        .find(|m| m.name() == first)?;
    for segment in segments {
        message = message.nested_type.iter().find(|m| m.name() == segment)?;
    }
    Some(message)
}

/// Lists the fully qualified names of every registered message.
pub fn registered_names() -> Vec<String> {
    fn walk(prefix: &str, messages: &[DescriptorProto], names: &mut Vec<String>) {
        for message in messages {
            let name = format!("{prefix}.{}", message.name());
            walk(&name, &message.nested_type, names);
            names.push(name);
        }
    }

    let mut names = Vec::new();
    walk(PACKAGE, &registry().file.message_type, &mut names);
    names.sort();
    names
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let file = resource_file();
        let encoded = FileDescriptorSet {
            file: vec![file.clone()],
        }
        .encode_to_vec();
        debug!(file = FILE_NAME, bytes = encoded.len(), "Registered descriptor");
        Registry { file, encoded }
    })
}

fn resource_file() -> FileDescriptorProto {
    let labels_entry = DescriptorProto {
        name: Some("LabelsEntry".to_string()),
        field: vec![string_field("key", 1), string_field("value", 2)],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    };

    let resource = DescriptorProto {
        name: Some("Resource".to_string()),
        field: vec![
            string_field("type", 1),
            FieldDescriptorProto {
                name: Some("labels".to_string()),
                number: Some(2),
                label: Some(Label::Repeated as i32),
                r#type: Some(Type::Message as i32),
                type_name: Some(format!(".{PACKAGE}.Resource.LabelsEntry")),
                json_name: Some("labels".to_string()),
                ..Default::default()
            },
        ],
        nested_type: vec![labels_entry],
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some(FILE_NAME.to_string()),
        package: Some(PACKAGE.to_string()),
        message_type: vec![resource],
        options: Some(FileOptions {
            java_package: Some("io.opencensus.proto.resource.v1".to_string()),
            java_outer_classname: Some("ResourceProto".to_string()),
            java_multiple_files: Some(true),
            go_package: Some(
                "github.com/census-instrumentation/opencensus-proto/gen-go/resource/v1".to_string(),
            ),
            ..Default::default()
        }),
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn string_field(name: &str, number: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::String as i32),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_resolves_nested_names() {
        let resource = lookup("opencensus.proto.resource.v1.Resource").expect("registered");
        assert_eq!(resource.name(), "Resource");
        assert_eq!(resource, super::resource());

        let entry =
            lookup(".opencensus.proto.resource.v1.Resource.LabelsEntry").expect("registered");
        assert_eq!(entry.name(), "LabelsEntry");
        assert!(entry.options.as_ref().map_or(false, |o| o.map_entry()));

        assert!(lookup("opencensus.proto.resource.v1").is_none());
        assert!(lookup("opencensus.proto.resource.v1.Missing").is_none());
        assert!(lookup("opencensus.proto.trace.v1.Span").is_none());
    }

    #[test]
    fn registered_names_are_qualified() {
        assert_eq!(
            registered_names(),
            [
                "opencensus.proto.resource.v1.Resource",
                "opencensus.proto.resource.v1.Resource.LabelsEntry",
            ]
        );
    }

    #[test]
    fn fields_match_wire_tags() {
        let fields = &resource().field;
        assert_eq!(fields.len(), 2);
        assert_eq!((fields[0].name(), fields[0].number()), ("type", 1));
        assert_eq!(fields[0].r#type(), Type::String);
        assert_eq!((fields[1].name(), fields[1].number()), ("labels", 2));
        assert_eq!(fields[1].label(), Label::Repeated);
        assert_eq!(
            fields[1].type_name(),
            ".opencensus.proto.resource.v1.Resource.LabelsEntry"
        );
    }

    #[test]
    fn encoded_set_decodes() {
        let set = FileDescriptorSet::decode(encoded_file_descriptor_set()).expect("must decode");
        assert_eq!(set.file.len(), 1);
        assert_eq!(&set.file[0], file_descriptor());
        assert_eq!(set.file[0].name(), FILE_NAME);
        assert_eq!(set.file[0].package(), PACKAGE);
        assert_eq!(set.file[0].syntax(), "proto3");
    }
}
