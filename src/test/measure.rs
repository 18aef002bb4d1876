use std::time::Duration;

use pretty_assertions::assert_eq;

use crate::{
    error::{Error, Result},
    measure::{timed, untimed, Measurement},
};

#[tokio::test]
async fn timed_records_elapsed_time() {
    let measurement = timed("sleepy", || async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<_, Error>(18_i64)
    })
    .await
    .unwrap();

    assert_eq!(measurement.label, "sleepy");
    assert_eq!(measurement.value, 18);
    assert!(measurement.elapsed.unwrap() >= Duration::from_millis(20));
    assert!(measurement.elapsed_ms().unwrap() >= 20);
}

#[tokio::test]
async fn untimed_has_no_elapsed_time() {
    let measurement = untimed("plain", || async { Ok::<_, Error>(7_i64) })
        .await
        .unwrap();
    assert_eq!(
        measurement,
        Measurement {
            label: "plain".to_string(),
            value: 7,
            elapsed: None,
        }
    );
    assert_eq!(measurement.to_string(), "plain: total page count 7");
}

#[tokio::test]
async fn errors_pass_through() {
    let op = || async { Err::<i64, _>(Error::invalid_response("boom")) };
    let result: Result<Measurement<i64>> = timed("failing", op).await;
    assert_eq!(
        result.unwrap_err().to_string(),
        "The store returned an invalid reply: boom"
    );
}

#[test]
fn display_includes_milliseconds_when_timed() {
    let measurement = Measurement {
        label: "pipeline".to_string(),
        value: 18_i64,
        elapsed: Some(Duration::from_micros(26_150)),
    };
    assert_eq!(
        measurement.to_string(),
        "pipeline: total page count 18 (26 ms)"
    );
}
