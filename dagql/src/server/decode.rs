use crate::class::InputSpec;
use crate::error::DagqlError;
use crate::literal::Literal;
use crate::server::Server;
use crate::types::Array;
use crate::types::IntoTyped;
use crate::types::Optional;
use crate::types::TypeRef;
use crate::types::TypedValue;

impl Server {
    /// Decodes `literal` as a value for the argument `input`.
    pub fn decode_literal(&self, literal: &Literal, input: &InputSpec) -> Result<TypedValue, DagqlError> {
        self.decode_value(literal, &input.ty)
    }

    pub(crate) fn decode_value(&self, literal: &Literal, ty: &TypeRef) -> Result<TypedValue, DagqlError> {
        match literal {
            Literal::Null => Ok(Optional::none(ty.clone()).into_typed()),
            Literal::Id(id) => {
                let type_name = id.type_ref().name();
                if type_name.is_empty() {
                    return Err(DagqlError::InvalidId {
                        reason: "ID has no type".to_string(),
                    });
                }
                Ok(self.class(type_name)?.new_id(id.as_ref().clone()))
            }
            Literal::List(items) => {
                let elem = ty.elem().unwrap_or(ty);
                let values = items
                    .iter()
                    .map(|item| self.decode_value(item, elem))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Array::new(elem.clone(), values).into_typed())
            }
            Literal::Object(_) => Err(DagqlError::NotImplemented(
                "input object literals".to_string(),
            )),
            Literal::Variable(name) => Err(DagqlError::InvalidLiteral {
                reason: format!("variable ${name} was not substituted"),
            }),
            Literal::Bool(_)
            | Literal::Int(_)
            | Literal::Float(_)
            | Literal::String(_)
            | Literal::Enum(_) => self.scalar(ty.name())?.decode(literal),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::id::Id;
    use crate::id::IdSelector;
    use crate::types::EnumType;
    use crate::types::IdRef;
    use crate::types::IntValue;
    use crate::types::ObjectValue;
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

    fn input(name: &str, ty: TypeRef) -> InputSpec {
        InputSpec {
            name: name.to_string(),
            ty,
            default: None,
            description: None,
        }
    }

    #[test]
    fn decodes_scalars_by_argument_type() {
        let server = Server::new(Query);
        let value = server
            .decode_literal(&Literal::Int(3), &input("n", TypeRef::named("Int").non_null()))
            .unwrap();
        assert_eq!(value.downcast_ref::<IntValue>(), Some(&IntValue(3)));

        let err = server
            .decode_literal(&Literal::Int(3), &input("s", TypeRef::named("String")))
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid literal: expected String, got 3");
    }

    #[test]
    fn decodes_lists_element_wise() {
        let server = Server::new(Query);
        let ty = TypeRef::list(TypeRef::named("Int").non_null());
        let value = server
            .decode_literal(&Literal::from(vec![1i64, 2]), &input("ns", ty))
            .unwrap();
        assert_eq!(value.type_ref().to_string(), "[Int!]!");
        assert_eq!(value.to_literal(), Literal::from(vec![1i64, 2]));
    }

    #[test]
    fn decodes_enums_through_registered_types() {
        let server = Server::new(Query);
        server.install_scalar(Arc::new(EnumType::new("Mood", ["HAPPY", "SAD"])));
        let value = server
            .decode_literal(&Literal::Enum("HAPPY".to_string()), &input("m", TypeRef::named("Mood")))
            .unwrap();
        assert_eq!(value.to_literal(), Literal::Enum("HAPPY".to_string()));

        let err = server
            .decode_literal(&Literal::Enum("HAPPY".to_string()), &input("m", TypeRef::named("Feeling")))
            .unwrap_err();
        assert_eq!(err, DagqlError::UnknownScalar("Feeling".to_string()));
    }

    #[test]
    fn decodes_ids_through_their_class() {
        let server = Server::new(Query);
        let id = Id::root(TypeRef::named("Query").non_null())
            .append(IdSelector::new("self"), TypeRef::named("Query").non_null());
        let value = server
            .decode_literal(&Literal::from(id.clone()), &input("q", TypeRef::named("QueryID")))
            .unwrap();
        assert_eq!(value.downcast_ref::<IdRef>().map(IdRef::id), Some(&id));

        let unknown = Id::root(TypeRef::named("Missing"));
        let err = server
            .decode_literal(&Literal::from(unknown), &input("q", TypeRef::named("QueryID")))
            .unwrap_err();
        assert_eq!(err, DagqlError::UnknownType("Missing".to_string()));
    }

    #[test]
    fn rejects_object_literals_and_null_becomes_optional() {
        let server = Server::new(Query);
        let err = server
            .decode_literal(&Literal::Object(vec![]), &input("o", TypeRef::named("Input")))
            .unwrap_err();
        assert_eq!(err.to_string(), "not implemented: input object literals");

        let value = server
            .decode_literal(&Literal::Null, &input("s", TypeRef::named("String")))
            .unwrap();
        assert!(value.unwrap_nullable().is_none());
    }
}
