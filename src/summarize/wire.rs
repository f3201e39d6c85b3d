use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct GenerateRequest<'a> {
    pub(crate) contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
pub(crate) struct RequestContent<'a> {
    pub(crate) role: &'a str,
    pub(crate) parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
pub(crate) struct RequestPart<'a> {
    pub(crate) text: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct GenerateEnvelope {
    pub(crate) candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
pub(crate) struct Candidate {
    pub(crate) content: Option<Content>,
}

#[derive(Deserialize)]
pub(crate) struct Content {
    pub(crate) parts: Option<Vec<Part>>,
}

#[derive(Deserialize)]
pub(crate) struct Part {
    pub(crate) text: Option<String>,
}

impl GenerateEnvelope {
    /// Concatenated text of the first candidate, if any.
    pub(crate) fn into_text(self) -> Option<String> {
        let parts = self
            .candidates?
            .into_iter()
            .next()?
            .content?
            .parts?;
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}
