//! Combinators over lifted inputs.
//!
//! Everything here is sugar over the lifting constructor and
//! [`Output::apply`]: joins ([`all`], [`all_entries`]), string assembly
//! ([`concat`], [`interpolate`]), the JSON bridge ([`json_stringify`],
//! [`json_parse`]), and the secrecy controls ([`secret`], [`unsecret`],
//! [`is_secret`]). Metadata propagates by the usual join: the result is
//! known only if every input is, secret if any input is, and depends on the
//! union of the inputs' resources.

use lodestar_core::{OutputError, Value};
use serde::de::Error as _;

use crate::input::Input;
use crate::output::{output, Output};

/// Joins any number of inputs into an output of the array of their values.
///
/// # Errors
///
/// Fails with [`OutputError::CircularStructure`] if an input's
/// synchronously available structure refers back to an ancestor.
pub fn all(inputs: impl IntoIterator<Item = Input>) -> Result<Output, OutputError> {
    output(Input::array(inputs))
}

/// Joins keyed inputs into an output of the record of their values.
///
/// # Errors
///
/// Fails with [`OutputError::CircularStructure`] if an input's
/// synchronously available structure refers back to an ancestor.
pub fn all_entries<K, V>(
    entries: impl IntoIterator<Item = (K, V)>,
) -> Result<Output, OutputError>
where
    K: Into<String>,
    V: Into<Input>,
{
    output(Input::object(entries))
}

/// Concatenates any number of string-coercible inputs into an output
/// string.
///
/// An empty argument list yields `""`.
///
/// # Errors
///
/// Fails with [`OutputError::CircularStructure`] if an input's
/// synchronously available structure refers back to an ancestor.
pub fn concat(parts: impl IntoIterator<Item = Input>) -> Result<Output, OutputError> {
    let joined = all(parts)?;
    Ok(joined.apply(|value| {
        let rendered = match value {
            Value::Array(items) => items.iter().map(Value::coerce_string).collect::<String>(),
            other => other.coerce_string(),
        };
        Input::from(rendered)
    }))
}

/// Renders a template of literal fragments interleaved with expression
/// inputs into an output string.
///
/// A template of N expressions carries N+1 literals (any of which may be
/// empty); surplus literals or expressions on either side are appended in
/// order, so the function is total.
///
/// # Errors
///
/// Fails with [`OutputError::CircularStructure`] if an expression's
/// synchronously available structure refers back to an ancestor.
///
/// # Example
///
/// ```
/// use lodestar_output::{interpolate, Input, Output};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), lodestar_core::OutputError> {
/// let name = Output::new("assets");
/// let url = interpolate(["s3://", "/index.html"], [Input::from(name)])?;
/// assert_eq!(
///     url.value().await?,
///     Some(lodestar_core::Value::from("s3://assets/index.html"))
/// );
/// # Ok(())
/// # }
/// ```
pub fn interpolate<S, L, E>(literals: L, expressions: E) -> Result<Output, OutputError>
where
    S: Into<String>,
    L: IntoIterator<Item = S>,
    E: IntoIterator<Item = Input>,
{
    let literals: Vec<String> = literals.into_iter().map(Into::into).collect();
    let joined = all(expressions)?;
    Ok(joined.apply(move |value| {
        let items = match value {
            Value::Array(items) => items,
            other => vec![other],
        };

        let mut rendered = String::new();
        let mut literals = literals.into_iter();
        for item in items {
            if let Some(literal) = literals.next() {
                rendered.push_str(&literal);
            }
            rendered.push_str(&item.coerce_string());
        }
        for literal in literals {
            rendered.push_str(&literal);
        }
        Input::from(rendered)
    }))
}

/// Produces an output of the JSON encoding of an input's resolved value.
///
/// Secrecy and transitive dependencies carry over from the input. If any
/// descendant is unknown the result is unknown and no partial JSON is
/// produced.
///
/// # Errors
///
/// Fails with [`OutputError::CircularStructure`] if the input's
/// synchronously available structure refers back to an ancestor.
pub fn json_stringify(input: impl Into<Input>) -> Result<Output, OutputError> {
    json_encode(input.into(), false)
}

/// Like [`json_stringify`], with two-space indentation.
///
/// # Errors
///
/// Fails with [`OutputError::CircularStructure`] if the input's
/// synchronously available structure refers back to an ancestor.
pub fn json_stringify_pretty(input: impl Into<Input>) -> Result<Output, OutputError> {
    json_encode(input.into(), true)
}

fn json_encode(input: Input, pretty: bool) -> Result<Output, OutputError> {
    let lifted = output(input)?;
    Ok(lifted.try_apply(move |value| {
        // An unknown anywhere means no partial document: stay unknown.
        let Some(json) = value.to_json() else {
            return Ok(Input::from(Value::Unknown));
        };
        let text = if pretty {
            serde_json::to_string_pretty(&json)
        } else {
            serde_json::to_string(&json)
        }
        .map_err(OutputError::json)?;
        Ok(Input::from(text))
    }))
}

/// Parses an output string as JSON, producing an output of the decoded
/// value. Metadata inherits from the input.
///
/// # Errors
///
/// Fails with [`OutputError::CircularStructure`] if the input's
/// synchronously available structure refers back to an ancestor. Malformed
/// JSON, or a resolved value that is not a string, rejects the result's
/// value and knownness with [`OutputError::Json`].
pub fn json_parse(input: impl Into<Input>) -> Result<Output, OutputError> {
    let lifted = output(input.into())?;
    Ok(lifted.try_apply(|value| match value {
        Value::Unknown => Ok(Input::from(Value::Unknown)),
        Value::String(text) => {
            let json: serde_json::Value =
                serde_json::from_str(&text).map_err(OutputError::json)?;
            Ok(Input::from(Value::from(json)))
        }
        other => Err(OutputError::json(serde_json::Error::custom(format!(
            "cannot parse json out of a {} value",
            other.kind()
        )))),
    }))
}

/// Lifts an input and marks the result secret.
///
/// # Errors
///
/// Fails with [`OutputError::CircularStructure`] if the input's
/// synchronously available structure refers back to an ancestor.
pub fn secret(input: impl Into<Input>) -> Result<Output, OutputError> {
    Ok(output(input.into())?.with_secrecy(true))
}

/// Lifts an input and strips secrecy from the result.
///
/// This is the only operation that removes the secret flag.
///
/// # Errors
///
/// Fails with [`OutputError::CircularStructure`] if the input's
/// synchronously available structure refers back to an ancestor.
pub fn unsecret(input: impl Into<Input>) -> Result<Output, OutputError> {
    Ok(output(input.into())?.with_secrecy(false))
}

/// Resolves whether an input lifts to a secret output.
///
/// # Errors
///
/// Fails with [`OutputError::CircularStructure`] if the input's
/// synchronously available structure refers back to an ancestor, and
/// propagates any failure of the underlying computation.
pub async fn is_secret(input: impl Into<Input>) -> Result<bool, OutputError> {
    output(input.into())?.is_secret().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_core::{ResourceId, ResourceSet};

    #[tokio::test]
    async fn all_collects_values_in_order() {
        let o = all([
            Input::from(1),
            Input::from(Output::new(2)),
            Input::pending(async { Ok(Input::from(3)) }),
        ])
        .unwrap();
        assert_eq!(o.value().await.unwrap(), Some(Value::array([1, 2, 3])));
    }

    #[tokio::test]
    async fn all_entries_collects_records() {
        let o = all_entries([("a", Input::from(1)), ("b", Input::from("two"))]).unwrap();
        assert_eq!(
            o.value().await.unwrap(),
            Some(Value::object([
                ("a", Value::from(1)),
                ("b", Value::from("two")),
            ]))
        );
    }

    #[tokio::test]
    async fn concat_coerces_and_joins() {
        let o = concat([
            Input::from("n="),
            Input::from(3),
            Input::from("; ok="),
            Input::from(true),
        ])
        .unwrap();
        assert_eq!(o.value().await.unwrap(), Some(Value::from("n=3; ok=true")));
    }

    #[tokio::test]
    async fn concat_of_nothing_is_empty_string() {
        let o = concat(Vec::new()).unwrap();
        assert_eq!(o.value().await.unwrap(), Some(Value::from("")));
    }

    #[tokio::test]
    async fn interpolate_interleaves_literals_and_expressions() {
        let o = interpolate(
            ["", ":", ""],
            [Input::from("host"), Input::from(8080)],
        )
        .unwrap();
        assert_eq!(o.value().await.unwrap(), Some(Value::from("host:8080")));
    }

    #[tokio::test]
    async fn interpolate_appends_surplus_literals() {
        let o = interpolate(["a", "b", "c"], [Input::from(1)]).unwrap();
        assert_eq!(o.value().await.unwrap(), Some(Value::from("a1bc")));
    }

    #[tokio::test]
    async fn json_stringify_encodes_resolved_value() {
        let o = json_stringify(Input::object([
            ("n", Input::from(1)),
            ("s", Input::from("x")),
        ]))
        .unwrap();
        assert_eq!(
            o.value().await.unwrap(),
            Some(Value::from(r#"{"n":1,"s":"x"}"#))
        );
    }

    #[tokio::test]
    async fn json_parse_decodes_text() {
        let o = json_parse(Input::from(r#"{"a":[1,2]}"#)).unwrap();
        assert_eq!(
            o.value().await.unwrap(),
            Some(Value::object([(
                "a",
                Value::array([1, 2])
            )]))
        );
    }

    #[tokio::test]
    async fn json_parse_rejects_malformed_text() {
        let o = json_parse(Input::from("{nope")).unwrap();
        assert!(matches!(o.value().await, Err(OutputError::Json(_))));
        assert!(matches!(o.is_known().await, Err(OutputError::Json(_))));
        // Metadata stays usable.
        assert!(!o.is_secret().await.unwrap());
    }

    #[tokio::test]
    async fn json_parse_rejects_non_string_values() {
        let o = json_parse(Input::from(12)).unwrap();
        assert!(matches!(o.value().await, Err(OutputError::Json(_))));
    }

    #[tokio::test]
    async fn secret_marks_and_unsecret_strips() {
        let o = secret(Input::from(5)).unwrap();
        assert!(o.is_secret().await.unwrap());
        assert_eq!(o.value().await.unwrap(), Some(Value::from(5)));

        let plain = unsecret(Input::from(o)).unwrap();
        assert!(!plain.is_secret().await.unwrap());
        assert_eq!(plain.value().await.unwrap(), Some(Value::from(5)));
    }

    #[tokio::test]
    async fn is_secret_resolves_the_flag() {
        assert!(!is_secret(Input::from(1)).await.unwrap());
        let s = secret(Input::from(1)).unwrap();
        assert!(is_secret(Input::from(s)).await.unwrap());
    }

    #[tokio::test]
    async fn json_stringify_preserves_secrecy_and_deps() {
        let deps = ResourceSet::singleton(ResourceId::from_urn("db"));
        let o = Output::resolved("hunter2", true, true, deps.clone());
        let encoded = json_stringify(Input::from(o)).unwrap();

        assert_eq!(
            encoded.value().await.unwrap(),
            Some(Value::from(r#""hunter2""#))
        );
        assert!(encoded.is_secret().await.unwrap());
        assert_eq!(encoded.all_resources().await.unwrap(), deps);
    }
}
