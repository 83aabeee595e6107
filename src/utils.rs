use std::collections::BTreeMap;

/// Every filter must be present with the exact same value. No filters match everything.
pub fn matches_annotation_filters(
    annotations: &BTreeMap<String, String>,
    filters: &BTreeMap<String, String>,
) -> bool {
    filters
        .iter()
        .all(|(key, value)| annotations.get(key) == Some(value))
}

#[macro_export]
macro_rules! instrumented {
    ($span:expr, $($tt:tt)+) => {{
        use ::tracing::Instrument;

        let span = $span;
        {
            $($tt)*
        }
        .instrument(span)
    }}
}

#[macro_export]
macro_rules! try_some {
    (@coalesce ($($h:tt)*)) => {
        $($h)*
    };
    (@coalesce ($($h:tt)*) ? $($t:tt)*) => {
        $crate::try_some!(@coalesce ($($h)*.as_ref()?) $($t)*)
    };
    (@coalesce ($($h:tt)*) $m:tt $($t:tt)*) => {
        $crate::try_some!(@coalesce ($($h)* $m) $($t)*)
    };

    ($($tt:tt)*) => {
        {
            fn call<R>(f: impl FnOnce() ->::std::option::Option<R>) -> ::std::option::Option <R>{
                f()
            }
            call(|| {
                ::std::option::Option::Some($crate::try_some!(@coalesce () $($tt)*))
            })
        }
    };
}
