//! Aggregation pipelines that compute the total page count on the store.
//!
//! Two equivalent shapes are provided: [`raw_pipeline`], written stage by stage, and [`Query`], a
//! small builder that lowers a "select, group, sum, first" expression into stages.

use mongodb::bson::{doc, Bson, Document};

use crate::{
    error::{Error, Result},
    model::fields,
};

/// Field of the per-entry subtotal produced by the first stage of [`raw_pipeline`].
pub const DOCUMENTS_PAGE_COUNT: &str = "DocumentsPageCount";

/// Field holding the grand total in the single row returned by [`raw_pipeline`].
pub const TOTAL_PAGE_COUNT: &str = "TotalPageCount";

/// Field holding the value of each row produced by a [`Query`].
pub const VALUE: &str = "_v";

const GROUP_ACCUMULATOR: &str = "__agg0";

/// The two-stage pipeline: a per-entry `$sum` over the documents' page counts, then a `$group`
/// with a null key summing the subtotals into [`TOTAL_PAGE_COUNT`].
pub fn raw_pipeline() -> Vec<Document> {
    vec![
        doc! {
            "$project": {
                DOCUMENTS_PAGE_COUNT: {
                    "$sum": fields::path(&[fields::DOCUMENTS, fields::PAGE_COUNT]),
                },
            },
        },
        doc! {
            "$group": {
                "_id": Bson::Null,
                TOTAL_PAGE_COUNT: {
                    "$sum": fields::path(&[DOCUMENTS_PAGE_COUNT]),
                },
            },
        },
    ]
}

/// The pipeline produced by [`Query::total_page_count`].
pub fn builder_pipeline() -> Result<Vec<Document>> {
    Query::total_page_count().into_pipeline()
}

#[derive(Clone, Debug, PartialEq)]
enum Step {
    SelectSum { array: String, field: String },
    GroupAllSum,
    First,
}

/// A read-only query over the entry collection, built up as a sequence of steps and lowered into
/// pipeline stages by [`Query::into_pipeline`]. Each row carries its value under [`VALUE`].
///
/// ```
/// use archive_page_count::{model::fields, pipeline::Query};
///
/// let pipeline = Query::new()
///     .select_sum(fields::DOCUMENTS, fields::PAGE_COUNT)
///     .group_all_sum()
///     .first()
///     .into_pipeline()
///     .unwrap();
/// assert_eq!(pipeline.len(), 4);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    steps: Vec<Step>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// The query computing the grand total of page counts over all entries.
    pub fn total_page_count() -> Self {
        Self::new()
            .select_sum(fields::DOCUMENTS, fields::PAGE_COUNT)
            .group_all_sum()
            .first()
    }

    /// Maps every entry to the sum of `field` over the elements of its `array` field.
    pub fn select_sum(mut self, array: impl Into<String>, field: impl Into<String>) -> Self {
        self.steps.push(Step::SelectSum {
            array: array.into(),
            field: field.into(),
        });
        self
    }

    /// Collapses every selected value into a single group and sums it.
    pub fn group_all_sum(mut self) -> Self {
        self.steps.push(Step::GroupAllSum);
        self
    }

    /// Keeps only the first row.
    pub fn first(mut self) -> Self {
        self.steps.push(Step::First);
        self
    }

    /// Lowers this query into aggregation stages.
    ///
    /// A query must select exactly once, and the selection must precede any grouping.
    pub fn into_pipeline(self) -> Result<Vec<Document>> {
        let mut stages = Vec::with_capacity(self.steps.len() + 1);
        let mut selected = false;

        for step in self.steps {
            match step {
                Step::SelectSum { array, field } => {
                    if selected {
                        return Err(Error::unsupported_pipeline(
                            "a query may only select one value per entry",
                        ));
                    }
                    selected = true;
                    stages.push(doc! {
                        "$project": {
                            VALUE: { "$sum": fields::path(&[array.as_str(), field.as_str()]) },
                            "_id": 0,
                        },
                    });
                }
                Step::GroupAllSum => {
                    if !selected {
                        return Err(Error::unsupported_pipeline(
                            "a query must select a value before grouping",
                        ));
                    }
                    stages.push(doc! {
                        "$group": {
                            "_id": Bson::Null,
                            GROUP_ACCUMULATOR: { "$sum": fields::path(&[VALUE]) },
                        },
                    });
                    stages.push(doc! {
                        "$project": {
                            VALUE: fields::path(&[GROUP_ACCUMULATOR]),
                            "_id": 0,
                        },
                    });
                }
                Step::First => {
                    stages.push(doc! { "$limit": 1_i64 });
                }
            }
        }

        if !selected {
            return Err(Error::unsupported_pipeline("a query must select a value"));
        }

        Ok(stages)
    }
}
