use mongodb::bson::{self, doc, oid::ObjectId, Bson};
use pretty_assertions::assert_eq;

use crate::model::{fields, ArchiveDocument, ArchiveEntry};

#[test]
fn serialized_keys_match_field_table() {
    let entry = ArchiveEntry {
        id: Some(ObjectId::new().to_hex()),
        ..ArchiveEntry::with_page_counts("entry", &[1])
    };
    let doc = bson::to_document(&entry).unwrap();
    assert_eq!(
        doc.keys().map(String::as_str).collect::<Vec<_>>(),
        vec![fields::ID, fields::NAME, fields::DOCUMENTS]
    );

    let nested = doc.get_array(fields::DOCUMENTS).unwrap()[0]
        .as_document()
        .unwrap();
    assert_eq!(
        nested.keys().map(String::as_str).collect::<Vec<_>>(),
        vec![fields::PAGE_COUNT]
    );
}

#[test]
fn object_id_is_read_as_hex() {
    let oid = ObjectId::new();
    let entry: ArchiveEntry = bson::from_document(doc! {
        "_id": oid,
        "Name": "report",
        "Documents": [ { "PageCount": 4 }, { "PageCount": 6_i64 } ],
    })
    .unwrap();

    assert_eq!(entry.id, Some(oid.to_hex()));
    assert_eq!(entry.name.as_deref(), Some("report"));
    assert_eq!(entry.page_count(), Some(10));

    let written = bson::to_document(&entry).unwrap();
    assert_eq!(written.get(fields::ID), Some(&Bson::ObjectId(oid)));
}

#[test]
fn missing_and_null_fields_are_absent() {
    let entry: ArchiveEntry = bson::from_document(doc! { "_id": Bson::Null }).unwrap();
    assert_eq!(entry, ArchiveEntry::default());
    assert!(entry.documents().is_empty());
    assert_eq!(entry.page_count(), Some(0));

    let written = bson::to_document(&entry).unwrap();
    assert!(!written.contains_key(fields::ID));
    assert!(!written.contains_key(fields::DOCUMENTS));
}

#[test]
fn page_counts_read_any_integral_number() {
    let entry: ArchiveEntry = bson::from_document(doc! {
        "Documents": [
            { "PageCount": 5 },
            { "PageCount": 6_i64 },
            { "PageCount": 7.0 },
            { "PageCount": Bson::Null },
            {},
        ],
    })
    .unwrap();
    assert_eq!(
        entry
            .documents()
            .iter()
            .map(|doc| doc.page_count)
            .collect::<Vec<_>>(),
        vec![5, 6, 7, 0, 0]
    );
    assert_eq!(entry.page_count(), Some(18));

    let fractional = doc! { "Documents": [ { "PageCount": 2.5 } ] };
    assert!(bson::from_document::<ArchiveEntry>(fractional).is_err());
}

#[test]
fn page_count_overflow_is_none() {
    let entry = ArchiveEntry::with_page_counts("huge", &[i64::MAX, 1]);
    assert_eq!(entry.page_count(), None);
}

#[test]
fn unexpected_identifier_type_is_rejected() {
    let result = bson::from_document::<ArchiveEntry>(doc! { "_id": 5 });
    assert!(result.is_err());
}

#[test]
fn with_page_counts_keeps_order() {
    let entry = ArchiveEntry::with_page_counts("ordered", &[3, 1, 2]);
    assert_eq!(
        entry.documents(),
        &[
            ArchiveDocument { page_count: 3 },
            ArchiveDocument { page_count: 1 },
            ArchiveDocument { page_count: 2 },
        ]
    );
}
