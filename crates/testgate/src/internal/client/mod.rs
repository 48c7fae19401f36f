pub mod facade;
pub mod host;

/// Requests admission for the current libtest test and evaluates to its
/// [`AdmissionGuard`](crate::client::AdmissionGuard). Returns from the enclosing
/// test when the demand can never be satisfied, and panics when the admission fails.
///
/// ```ignore
/// #[test]
/// fn test_heavy() {
///     let _guard = admit_or_skip!(client(), ResourceSet::new().with("cpu", 8));
///     // ...
/// }
/// ```
///
/// Use the `async` form inside async test bodies.
#[macro_export]
macro_rules! admit_or_skip {
    (async $client:expr, $demand:expr) => {
        match $client
            .request_admission(&$crate::client::LibtestHost, $demand)
            .await
        {
            Ok($crate::client::Admission::Granted(guard)) => guard,
            Ok($crate::client::Admission::Skipped(_)) => return,
            Err(error) => panic!("Admission failed: {error}"),
        }
    };
    ($client:expr, $demand:expr) => {
        match $client.request_admission_blocking(&$crate::client::LibtestHost, $demand) {
            Ok($crate::client::Admission::Granted(guard)) => guard,
            Ok($crate::client::Admission::Skipped(_)) => return,
            Err(error) => panic!("Admission failed: {error}"),
        }
    };
}
