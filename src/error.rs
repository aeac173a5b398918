//! Crate-wide error type.
//!
//! DOM helpers keep returning `Result<_, JsValue>` like the rest of the
//! wasm-bindgen surface; everything that reasons about the graph, the
//! registry or the gateway uses [`FrontendError`].

use wasm_bindgen::{JsCast, JsValue};

#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    #[error("{0}")]
    Js(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("missing DOM element #{0}")]
    MissingElement(String),

    #[error("unknown node type {0}")]
    UnknownNodeType(String),

    #[error("node type {type_id} has no widget {widget}")]
    UnknownWidget { type_id: String, widget: String },

    #[error("invalid value {raw:?} for widget {widget}")]
    InvalidWidgetValue { widget: String, raw: String },

    #[error("value list for {0} must not be empty")]
    EmptyValueList(String),

    #[error("graph error: {0}")]
    Graph(String),
}

impl From<JsValue> for FrontendError {
    fn from(value: JsValue) -> Self {
        let text = value
            .as_string()
            .or_else(|| {
                value
                    .dyn_ref::<js_sys::Error>()
                    .map(|e| String::from(e.message()))
            })
            .unwrap_or_else(|| format!("{:?}", value));
        FrontendError::Js(text)
    }
}

impl From<FrontendError> for JsValue {
    fn from(err: FrontendError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

pub type Result<T, E = FrontendError> = std::result::Result<T, E>;
