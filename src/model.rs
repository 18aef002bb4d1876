//! The records read from the archive collection.

use mongodb::bson::Bson;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Names of the stored fields. Every serde attribute below and every pipeline stage refers to
/// the store through these.
pub mod fields {
    /// The primary key of an entry.
    pub const ID: &str = "_id";

    /// The optional display name of an entry.
    pub const NAME: &str = "Name";

    /// The array of documents owned by an entry.
    pub const DOCUMENTS: &str = "Documents";

    /// The page count of a single document.
    pub const PAGE_COUNT: &str = "PageCount";

    /// Builds the `$`-prefixed field path for a dotted sequence of field names, e.g.
    /// `$Documents.PageCount`.
    pub fn path(segments: &[&str]) -> String {
        format!("${}", segments.join("."))
    }
}

/// An archive entry, owning an ordered list of documents.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ArchiveEntry {
    /// The identifier, read from an `ObjectId` as its hex string.
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        with = "object_id_hex"
    )]
    pub id: Option<String>,

    #[serde(rename = "Name", default)]
    pub name: Option<String>,

    /// Absent documents contribute nothing to a total and are not written back as `null`.
    #[serde(rename = "Documents", default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<ArchiveDocument>>,
}

impl ArchiveEntry {
    /// Creates an entry without an identifier holding one document per page count.
    pub fn with_page_counts(name: impl Into<String>, page_counts: &[i64]) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            documents: Some(
                page_counts
                    .iter()
                    .map(|&page_count| ArchiveDocument { page_count })
                    .collect(),
            ),
        }
    }

    /// The documents of this entry, or an empty slice when the list is absent.
    pub fn documents(&self) -> &[ArchiveDocument] {
        self.documents.as_deref().unwrap_or_default()
    }

    /// The sum of the page counts of this entry's documents, or `None` if it overflows `i64`.
    pub fn page_count(&self) -> Option<i64> {
        self.documents()
            .iter()
            .try_fold(0_i64, |total, doc| total.checked_add(doc.page_count))
    }
}

/// A single archived document.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct ArchiveDocument {
    /// Missing or null counts read as zero, the same as `$sum` skipping them.
    #[serde(
        rename = "PageCount",
        default,
        deserialize_with = "page_count_number::deserialize"
    )]
    pub page_count: i64,
}

/// Reads a page count stored as any integral BSON number.
mod page_count_number {
    use super::*;
    use serde::de::Error as _;

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<i64, D::Error> {
        match Option::<Bson>::deserialize(deserializer)? {
            None | Some(Bson::Null) => Ok(0),
            Some(Bson::Int32(n)) => Ok(i64::from(n)),
            Some(Bson::Int64(n)) => Ok(n),
            Some(Bson::Double(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
            Some(other) => Err(D::Error::custom(format!(
                "expected an integral PageCount, got {other}"
            ))),
        }
    }
}

/// Reads `_id` as a string whether it is stored as an `ObjectId` or as a plain string, and
/// writes hex strings that parse as an `ObjectId` back as one.
mod object_id_hex {
    use super::*;
    use mongodb::bson::oid::ObjectId;
    use serde::de::Error as _;

    pub(super) fn serialize<S: Serializer>(
        id: &Option<String>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match id {
            Some(id) => match ObjectId::parse_str(id) {
                Ok(oid) => oid.serialize(serializer),
                Err(_) => id.serialize(serializer),
            },
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<String>, D::Error> {
        match Option::<Bson>::deserialize(deserializer)? {
            None | Some(Bson::Null) => Ok(None),
            Some(Bson::ObjectId(oid)) => Ok(Some(oid.to_hex())),
            Some(Bson::String(s)) => Ok(Some(s)),
            Some(other) => Err(D::Error::custom(format!(
                "expected an ObjectId or string _id, got {:?}",
                other.element_type()
            ))),
        }
    }
}
