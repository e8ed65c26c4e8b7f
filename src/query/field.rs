use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A field the orchestrator can generate for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AiAutoGeneratedField {
    Title,
    Caption,
    Tags,
    Semantic,
}

impl AiAutoGeneratedField {
    /// Every field, in request order. The default for a bare request.
    pub const ALL: [Self; 4] = [Self::Title, Self::Caption, Self::Tags, Self::Semantic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Caption => "caption",
            Self::Tags => "tags",
            Self::Semantic => "semantic",
        }
    }
}

impl fmt::Display for AiAutoGeneratedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiAutoGeneratedField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "unknown field `{s}` (expected one of: title, caption, tags, semantic)"
                )
            })
    }
}

/// A single-field query sent to an AI service.
///
/// `Semantic` requests are served by [`AiImageQuery::DescriptionSmall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiImageQuery {
    Title,
    Caption,
    Tags,
    DescriptionSmall,
}

impl AiImageQuery {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Caption => "caption",
            Self::Tags => "tags",
            Self::DescriptionSmall => "description-small",
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Title => {
                "Write a short, compelling title for this image in 3 to 6 words. \
                 Return only the title, with no quotes and no trailing punctuation."
            }
            Self::Caption => {
                "Write a one or two sentence caption for this image, like a magazine caption. \
                 Return only the caption."
            }
            Self::Tags => {
                "List 5 to 10 keywords describing this image as a single comma-separated line. \
                 Use lowercase and return only the list."
            }
            Self::DescriptionSmall => {
                "Describe the contents of this image in one plain, literal sentence \
                 suitable for search indexing. Return only the sentence."
            }
        }
    }
}

impl fmt::Display for AiImageQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_field_names() {
        assert_eq!("title".parse::<AiAutoGeneratedField>().unwrap(), AiAutoGeneratedField::Title);
        assert_eq!(" Semantic ".parse::<AiAutoGeneratedField>().unwrap(), AiAutoGeneratedField::Semantic);
        assert!("gps".parse::<AiAutoGeneratedField>().is_err());
    }

    #[test]
    fn field_serde_names_match_display() {
        for field in AiAutoGeneratedField::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{field}\""));
        }
    }

    #[test]
    fn prompts_are_distinct() {
        let queries = [
            AiImageQuery::Title,
            AiImageQuery::Caption,
            AiImageQuery::Tags,
            AiImageQuery::DescriptionSmall,
        ];
        for (i, a) in queries.iter().enumerate() {
            for b in &queries[i + 1..] {
                assert_ne!(a.prompt(), b.prompt());
            }
        }
        assert_eq!(AiImageQuery::DescriptionSmall.to_string(), "description-small");
    }
}
