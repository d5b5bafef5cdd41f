use std::fmt::Write;

use crate::class::FieldDefinition;
use crate::class::InputSpec;
use crate::literal::Literal;
use crate::server::Server;

impl Server {
    /// The schema in SDL form: the root, then scalars and enums, then object
    /// types, each group sorted by name. Built-in scalars are omitted.
    pub fn schema_sdl(&self) -> String {
        let root = self.root();
        let mut sdl = format!("schema {{\n  query: {}\n}}\n", root.type_ref().name());

        let mut scalars: Vec<(String, String)> = self
            .inner
            .scalars
            .iter()
            .filter_map(|scalar| {
                scalar
                    .value()
                    .definition()
                    .map(|definition| (scalar.key().clone(), definition))
            })
            .collect();
        scalars.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, definition) in scalars {
            sdl.push('\n');
            sdl.push_str(&definition);
            sdl.push('\n');
        }

        let mut classes: Vec<_> = self
            .inner
            .classes
            .iter()
            .map(|class| class.value().clone())
            .collect();
        classes.sort_by(|a, b| a.type_name().cmp(b.type_name()));
        for class in classes {
            sdl.push('\n');
            if let Some(description) = class.description() {
                write_description(&mut sdl, &description, "");
            }
            let _ = writeln!(sdl, "type {} {{", class.type_name());
            for field in class.field_definitions() {
                write_field(&mut sdl, &field);
            }
            sdl.push_str("}\n");
        }
        sdl
    }
}

fn write_description(sdl: &mut String, description: &str, indent: &str) {
    let description = description.replace(r#"""""#, r#"\""""#);
    let _ = writeln!(sdl, "{indent}\"\"\"{description}\"\"\"");
}

fn write_field(sdl: &mut String, field: &FieldDefinition) {
    if let Some(description) = &field.description {
        write_description(sdl, description, "  ");
    }
    let _ = write!(sdl, "  {}", field.name);
    if !field.args.is_empty() {
        sdl.push('(');
        for (i, arg) in field.args.iter().enumerate() {
            if i > 0 {
                sdl.push_str(", ");
            }
            write_argument(sdl, arg);
        }
        sdl.push(')');
    }
    let _ = write!(sdl, ": {}", field.ty);
    if let Some(reason) = &field.deprecated {
        let _ = write!(sdl, " @deprecated(reason: {})", Literal::from(reason.as_str()));
    }
    sdl.push('\n');
}

fn write_argument(sdl: &mut String, arg: &InputSpec) {
    let _ = write!(sdl, "{}: {}", arg.name, arg.ty);
    if let Some(default) = &arg.default {
        let _ = write!(sdl, " = {default}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Field;
    use crate::class::Fields;
    use crate::class::Instance;
    use crate::types::IntoTyped;
    use crate::types::ObjectValue;
    use crate::types::StringValue;
    use crate::types::TypeRef;
    use crate::types::Typed;

    #[derive(Debug)]
    struct Query;

    impl Typed for Query {
        fn type_ref(&self) -> TypeRef {
            TypeRef::named("Query").non_null()
        }
    }

    impl ObjectValue for Query {
        const TYPE_NAME: &'static str = "Query";
    }

    #[test]
    fn block_quotes_in_docs_are_escaped() {
        let server = Server::new(Query);
        Fields::new()
            .field(
                Field::new(
                    "quote",
                    TypeRef::named("String").non_null(),
                    |_ctx, _this: Instance<Query>, _args| async {
                        Ok(StringValue::from("").into_typed())
                    },
                )
                .doc(r#"Wraps text in """ quotes."#),
            )
            .install(&server)
            .unwrap();
        let sdl = server.schema_sdl();
        assert!(
            sdl.contains(r#"  """Wraps text in \""" quotes.""""#),
            "{sdl}"
        );
    }
}
