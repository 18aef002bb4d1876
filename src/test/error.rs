use std::time::Duration;

use mongodb::error::{Error as DriverError, ErrorKind as DriverErrorKind};

use crate::{
    error::{Error, ErrorKind},
    options::StoreOptions,
    store::MongoStore,
};

#[test]
fn io_errors_are_connection_errors() {
    let driver: DriverError =
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into();
    assert!(matches!(driver.kind.as_ref(), DriverErrorKind::Io(_)));

    let error = Error::from(driver);
    assert!(error.is_connection_error());
    assert!(!error.is_query_error());
    assert_eq!(error.code(), None);
}

#[test]
fn local_error_kinds_are_neither_connection_nor_query_errors() {
    let error = Error::invalid_response("bad row");
    assert!(!error.is_connection_error());
    assert!(!error.is_query_error());
    assert!(matches!(
        error.kind.as_ref(),
        ErrorKind::InvalidResponse { .. }
    ));
}

#[tokio::test]
async fn unreachable_store_is_a_connection_error() {
    let options = StoreOptions::builder()
        .uri("mongodb://127.0.0.1:1/?directConnection=true")
        .server_selection_timeout(Duration::from_millis(250))
        .build();

    let error = MongoStore::connect(&options).await.unwrap_err();
    assert!(error.is_connection_error(), "{error}");
}

#[tokio::test]
async fn malformed_connection_string_is_a_configuration_error() {
    let options = StoreOptions::builder().uri("mongodb://").build();
    let error = MongoStore::connect(&options).await.unwrap_err();
    assert!(
        matches!(error.kind.as_ref(), ErrorKind::InvalidConfiguration { .. }),
        "{error}"
    );
}
