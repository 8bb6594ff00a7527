//! Request planning.
//!
//! Translates a tool call (tool arguments plus the tool's [`OperationDescriptor`]) back into the
//! concrete parts of an outbound HTTP request. Planning performs no I/O; [`RequestPlan::to_request`]
//! turns a plan into a `reqwest` request for callers that want to send it.

use crate::error::{OpenApiToolsError, Result};
use crate::operation::{HttpMethod, OperationDescriptor};
use crate::schema::JsonObject;
use crate::sources::ParameterSource;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// A single `name=value` pair of the query string, a header or a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pair {
    pub name: String,
    pub value: String,
}

impl Pair {
    fn new(name: &str, value: String) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// The outbound request for one tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPlan {
    pub method: HttpMethod,
    /// Path with every `{param}` substituted and percent-encoded.
    pub path: String,
    pub query: Vec<Pair>,
    pub headers: Vec<Pair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_body: Option<JsonObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_fields: Option<Vec<Pair>>,
}

impl RequestPlan {
    /// Plan the request for `tool` called with `arguments`.
    ///
    /// Arguments that are not in the descriptor's parameter sources are dropped; `null` values
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::InvalidArguments`] if `arguments` is not an object, a path
    /// parameter is missing, or a field is routed to the cookie source.
    pub fn build(tool: &str, descriptor: &OperationDescriptor, arguments: &Value) -> Result<Self> {
        let invalid = |message: String| OpenApiToolsError::InvalidArguments {
            tool: tool.to_string(),
            message,
        };

        let empty = JsonObject::new();
        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => return Err(invalid(format!("expected an object, got {other}"))),
        };

        let mut path_values: HashMap<&str, String> = HashMap::new();
        let mut query = Vec::new();
        let mut headers = Vec::new();
        let mut json_body: Option<JsonObject> = None;
        let mut form_fields: Option<Vec<Pair>> = None;

        for (name, value) in arguments {
            if value.is_null() {
                continue;
            }
            let Some(source) = descriptor.parameter_sources.get(name) else {
                debug!(tool, argument = %name, "Dropping argument with no parameter source");
                continue;
            };
            match source {
                ParameterSource::Path => {
                    path_values.insert(name, encode_path_segment(&value_to_string(value)));
                }
                ParameterSource::Query => query.extend(expand_pairs(name, value)),
                ParameterSource::Header => headers.push(Pair::new(name, header_value(value))),
                ParameterSource::Body => {
                    json_body
                        .get_or_insert_with(JsonObject::new)
                        .insert(name.clone(), value.clone());
                }
                ParameterSource::FormData => form_fields
                    .get_or_insert_with(Vec::new)
                    .extend(expand_pairs(name, value)),
                ParameterSource::Cookie => {
                    return Err(invalid(format!(
                        "'{name}' is a cookie parameter, which is not supported"
                    )));
                }
            }
        }

        let path = render_path(&descriptor.path_template, &path_values).map_err(invalid)?;

        Ok(Self {
            method: descriptor.http_method,
            path,
            query,
            headers,
            json_body,
            form_fields,
        })
    }

    /// Full URL of the planned request against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL does not parse.
    pub fn url(&self, base_url: &str) -> Result<Url> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), self.path);
        let mut url = Url::parse(&url)
            .map_err(|e| OpenApiToolsError::OpenApi(format!("Invalid URL '{url}': {e}")))?;

        if !self.query.is_empty() {
            let query = self
                .query
                .iter()
                .map(|p| {
                    format!(
                        "{}={}",
                        encode_query_component(&p.name),
                        encode_query_component(&p.value)
                    )
                })
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }

        Ok(url)
    }

    /// Build a `reqwest` request for this plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built.
    pub fn to_request(&self, client: &Client, base_url: &str) -> Result<reqwest::RequestBuilder> {
        let mut request = client.request(self.method.to_reqwest(), self.url(base_url)?);
        for header in &self.headers {
            request = request.header(&header.name, &header.value);
        }
        if let Some(body) = &self.json_body {
            request = request.json(body);
        } else if let Some(fields) = &self.form_fields {
            let form = fields
                .iter()
                .fold(reqwest::multipart::Form::new(), |form, field| {
                    form.text(field.name.clone(), field.value.clone())
                });
            request = request.multipart(form);
        }
        Ok(request)
    }
}

fn render_path(
    template: &str,
    values: &HashMap<&str, String>,
) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        let value = values
            .get(name)
            .ok_or_else(|| format!("missing path parameter '{name}'"))?;
        out.push_str(&rest[..start]);
        out.push_str(value);
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Query/form pairs for one argument: arrays repeat the key, objects are JSON-encoded.
fn expand_pairs(name: &str, value: &Value) -> Vec<Pair> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| Pair::new(name, value_to_string(item)))
            .collect(),
        other => vec![Pair::new(name, value_to_string(other))],
    }
}

fn header_value(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        other => value_to_string(other),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

fn encode_path_segment(s: &str) -> String {
    percent_encode(s)
}

fn encode_query_component(s: &str) -> String {
    percent_encode(s)
}

/// Percent-encode everything except RFC 3986 unreserved characters.
fn percent_encode(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceMap;
    use serde_json::json;

    fn descriptor(method: HttpMethod, path: &str, sources: &[(&str, ParameterSource)]) -> OperationDescriptor {
        OperationDescriptor {
            operation_id: "op".to_string(),
            http_method: method,
            path_template: path.to_string(),
            parameter_sources: sources
                .iter()
                .map(|(name, source)| ((*name).to_string(), *source))
                .collect::<SourceMap>(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn routes_each_field_to_its_source() {
        let d = descriptor(
            HttpMethod::Post,
            "/users/{userId}/notes",
            &[
                ("userId", ParameterSource::Path),
                ("tags", ParameterSource::Query),
                ("X-Request-Id", ParameterSource::Header),
                ("title", ParameterSource::Body),
            ],
        );
        let plan = RequestPlan::build(
            "create_note",
            &d,
            &json!({
                "userId": "a b/c",
                "tags": ["x", "y"],
                "X-Request-Id": 42,
                "title": "hello",
                "unknown": "dropped",
                "ignored": null
            }),
        )
        .unwrap();

        assert_eq!(plan.method, HttpMethod::Post);
        assert_eq!(plan.path, "/users/a%20b%2Fc/notes");
        assert_eq!(
            plan.query,
            vec![Pair::new("tags", "x".into()), Pair::new("tags", "y".into())]
        );
        assert_eq!(plan.headers, vec![Pair::new("X-Request-Id", "42".into())]);
        assert_eq!(
            plan.json_body,
            json!({ "title": "hello" }).as_object().cloned()
        );
        assert!(plan.form_fields.is_none());

        let url = plan.url("https://api.example.com/v1/").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/users/a%20b%2Fc/notes?tags=x&tags=y"
        );
    }

    #[test]
    fn form_fields_are_collected() {
        let d = descriptor(
            HttpMethod::Post,
            "/photos",
            &[("caption", ParameterSource::FormData)],
        );
        let plan = RequestPlan::build("upload", &d, &json!({ "caption": "sunset" })).unwrap();
        assert_eq!(plan.form_fields, Some(vec![Pair::new("caption", "sunset".into())]));
        assert!(plan.json_body.is_none());
    }

    #[test]
    fn missing_path_parameter_is_an_error() {
        let d = descriptor(HttpMethod::Get, "/pets/{petId}", &[("petId", ParameterSource::Path)]);
        let err = RequestPlan::build("get_pet", &d, &json!({})).unwrap_err();
        assert!(err.to_string().contains("missing path parameter 'petId'"));
    }

    #[test]
    fn null_arguments_are_treated_as_empty() {
        let d = descriptor(HttpMethod::Get, "/pets", &[]);
        let plan = RequestPlan::build("list_pets", &d, &Value::Null).unwrap();
        assert_eq!(plan.path, "/pets");
        assert!(plan.query.is_empty());

        let err = RequestPlan::build("list_pets", &d, &json!([1])).unwrap_err();
        assert!(matches!(err, OpenApiToolsError::InvalidArguments { .. }));
    }

    #[test]
    fn objects_in_query_are_json_encoded() {
        let d = descriptor(HttpMethod::Get, "/search", &[("filter", ParameterSource::Query)]);
        let plan = RequestPlan::build("search", &d, &json!({ "filter": { "a": 1 } })).unwrap();
        assert_eq!(plan.query, vec![Pair::new("filter", r#"{"a":1}"#.into())]);
        assert_eq!(
            plan.url("http://localhost").unwrap().query(),
            Some("filter=%7B%22a%22%3A1%7D")
        );
    }

    #[test]
    fn builds_a_reqwest_request() {
        let d = descriptor(
            HttpMethod::Put,
            "/pets/{id}",
            &[("id", ParameterSource::Path), ("name", ParameterSource::Body)],
        );
        let plan = RequestPlan::build("update_pet", &d, &json!({ "id": 7, "name": "Rex" })).unwrap();
        let request = plan
            .to_request(&Client::new(), "http://localhost:8080")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::PUT);
        assert_eq!(request.url().as_str(), "http://localhost:8080/pets/7");
        assert_eq!(
            request.headers()[reqwest::header::CONTENT_TYPE],
            "application/json"
        );
    }
}
