use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub text: String,
}

impl TextContent {
    pub fn new<S: Into<String>>(text: S) -> Self {
        TextContent { text: text.into() }
    }
}
