/**
 * Question banks and the questions in them.
 *
 * The selection engine only ever looks at a question's id, area and difficulty. Every
 * other field (question text, options, charts, tiles and so on) is kept verbatim so
 * that front-ends can render it.
 */
use std::borrow::Borrow;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

use super::common::{DrillError, Result};


/// Area assigned to questions that do not declare one.
pub const UNKNOWN_AREA: &str = "unknown";
/// Area assigned to passage questions that do not declare one.
pub const READING_AREA: &str = "reading";


/// The difficulty tier of a question.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Standard,
    Hard,
}


impl Difficulty {
    /// The tiers from easiest to hardest.
    pub const SCALE: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Standard, Difficulty::Hard];

    /// Parse a difficulty tag as it appears in bank files. `np` and `normal` are older
    /// spellings of `standard`.
    pub fn from_tag(tag: &str) -> Option<Difficulty> {
        match tag.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "standard" | "np" | "normal" => Some(Difficulty::Standard),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Standard => "standard",
            Difficulty::Hard => "hard",
        }
    }
}


impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Standard
    }
}


impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().and_then(Difficulty::from_tag).unwrap_or_default())
    }
}


/// Represents a single question.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuestionItem {
    /// Identifier, unique within a bank. Questions without one can still be asked but
    /// are never tracked as served.
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The area as written in the bank. Use `area()` for the normalized key.
    #[serde(default, rename = "area", skip_serializing_if = "Option::is_none")]
    pub raw_area: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// How a front-end should render the question, e.g. `mc` or `dnd`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
    /// Everything else in the record.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}


impl QuestionItem {
    pub fn new(id: &str, area: &str, difficulty: Difficulty) -> Self {
        QuestionItem {
            id: Some(id.to_string()),
            raw_area: Some(area.to_string()),
            difficulty,
            type_tag: None,
            payload: Map::new(),
        }
    }

    /// The normalized area key of this question.
    pub fn area(&self) -> String {
        match self.raw_area.as_deref().map(normalize_area) {
            Some(area) if !area.is_empty() => area,
            _ => {
                if self.payload_str("title").is_some() && self.payload_str("text").is_some() {
                    String::from(READING_AREA)
                } else {
                    String::from(UNKNOWN_AREA)
                }
            }
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// `true` for plain multiple-choice questions, which have no type tag or `mc`.
    pub fn is_multiple_choice(&self) -> bool {
        match self.type_tag.as_deref() {
            None | Some("") | Some("mc") => true,
            _ => false,
        }
    }

    /// The question text.
    pub fn prompt(&self) -> Option<&str> {
        self.payload_str("q").or_else(|| self.payload_str("question"))
    }

    /// The answer options of a multiple-choice question.
    pub fn options(&self) -> Vec<&str> {
        match self.payload.get("options") {
            Some(Value::Array(options)) => options.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Index into `options()` of the correct answer.
    pub fn correct_index(&self) -> Option<usize> {
        self.payload.get("correct").and_then(Value::as_u64).map(|i| i as usize)
    }

    pub fn hint(&self) -> Option<&str> {
        self.payload_str("hint")
    }

    pub fn explanation(&self) -> Option<&str> {
        self.payload_str("explain")
    }

    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
    }
}


/// Normalize an area tag so that differently written tags share a history: surrounding
/// whitespace is dropped, letters are lower-cased and the result is in Unicode NFC.
pub fn normalize_area(area: &str) -> String {
    area.trim().to_lowercase().nfc().collect::<String>()
}


fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}


/// A reading passage with questions about it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Passage {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionItem>,
}


/// Represents a question bank for one subject.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Bank {
    pub subject: String,
    #[serde(default)]
    pub grade: Option<Value>,
    #[serde(default)]
    pub items: Vec<QuestionItem>,
    #[serde(default)]
    pub passages: Vec<Passage>,
}


#[derive(Deserialize)]
struct LegacyPart {
    #[serde(default)]
    items: Vec<QuestionItem>,
    #[serde(default)]
    passages: Vec<Passage>,
}


impl Bank {
    /// The subject under which outcomes and served questions are recorded.
    pub fn topic(&self) -> String {
        normalize_area(&self.subject)
    }

    /// All questions of the bank, with passage questions flattened into ordinary
    /// questions that carry their passage's title and text.
    pub fn expanded_items(&self) -> Vec<QuestionItem> {
        let mut items = self.items.clone();
        for passage in self.passages.iter() {
            for question in passage.questions.iter() {
                let mut q = question.clone();
                if let Some(title) = &passage.title {
                    q.payload.entry("title").or_insert_with(|| Value::String(title.clone()));
                }
                if let Some(text) = &passage.text {
                    q.payload.entry("text").or_insert_with(|| Value::String(text.clone()));
                }
                items.push(q);
            }
        }
        items
    }

    /// Distinct areas of `expanded_items()`, in order of first appearance.
    pub fn areas(&self) -> Vec<String> {
        distinct_areas(&self.expanded_items())
    }

    pub fn find(&self, id: &str) -> Option<QuestionItem> {
        self.expanded_items().into_iter().find(|q| q.id() == Some(id))
    }
}


/// Distinct areas of `items`, in order of first appearance.
pub fn distinct_areas<T: Borrow<QuestionItem>>(items: &[T]) -> Vec<String> {
    let mut areas: Vec<String> = Vec::new();
    for item in items.iter() {
        let area = item.borrow().area();
        if !areas.contains(&area) {
            areas.push(area);
        }
    }
    areas
}


/// Interpret a parsed bank file. Two shapes are understood: a single-subject bank
/// `{subject, grade?, items, passages?}` and the older two-subject shape
/// `{svenska: {...}, matematik: {...}}`, from which `subject_hint` picks one part
/// (`svenska` if no hint is given).
pub fn normalize_bank(raw: Value, subject_hint: Option<&str>) -> Result<Bank> {
    let object = match raw {
        Value::Object(object) => object,
        _ => return Err(DrillError::BankFormat(String::from("expected a JSON object"))),
    };

    if object.get("subject").map_or(false, Value::is_string)
        && object.get("items").map_or(false, Value::is_array)
    {
        let bank: Bank = serde_json::from_value(Value::Object(object))?;
        return Ok(bank);
    }

    if object.contains_key("svenska") || object.contains_key("matematik") {
        let subject = subject_hint.unwrap_or("svenska").to_string();
        let part = object.get(subject.as_str()).cloned().ok_or_else(|| {
            DrillError::BankFormat(format!("legacy bank has no '{}' section", subject))
        })?;
        let part: LegacyPart = serde_json::from_value(part)?;
        return Ok(Bank {
            subject,
            grade: None,
            items: part.items,
            passages: part.passages,
        });
    }

    Err(DrillError::BankFormat(String::from("expected 'subject' and 'items' fields")))
}


/// Load a bank from a JSON file.
pub fn load_bank(path: &Path, subject_hint: Option<&str>) -> Result<Bank> {
    if !path.exists() {
        return Err(DrillError::BankNotFound(path.to_path_buf()));
    }
    let data = fs::read_to_string(path)?;
    let raw: Value = serde_json::from_str(&data)?;
    normalize_bank(raw, subject_hint)
}
