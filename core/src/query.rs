//! URL construction: path resolution plus query parameters.

use url::Url;

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl QueryValue {
    /// Text placed in the query string: `true`/`false`, plain decimal
    /// integers, and floats without a trailing `.0` when integral.
    pub fn to_query_string(&self) -> String {
        match self {
            QueryValue::Str(s) => s.clone(),
            QueryValue::Int(n) => n.to_string(),
            QueryValue::Bool(b) => b.to_string(),
            QueryValue::Float(f) if f.is_nan() => "NaN".to_string(),
            QueryValue::Float(f) if f.is_infinite() => {
                if *f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
            }
            QueryValue::Float(f) => f.to_string(),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::Str(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::Str(v)
    }
}

impl From<&String> for QueryValue {
    fn from(v: &String) -> Self {
        QueryValue::Str(v.clone())
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::Bool(v)
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Float(v)
    }
}

impl From<f32> for QueryValue {
    fn from(v: f32) -> Self {
        QueryValue::Float(f64::from(v))
    }
}

macro_rules! int_query_value {
    ($($t:ty),*) => {
        $(impl From<$t> for QueryValue {
            fn from(v: $t) -> Self {
                QueryValue::Int(i64::from(v))
            }
        })*
    };
}

int_query_value!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! wide_int_query_value {
    ($($t:ty),*) => {
        $(impl From<$t> for QueryValue {
            /// Values beyond `i64` keep their exact decimal text.
            fn from(v: $t) -> Self {
                i64::try_from(v)
                    .map(QueryValue::Int)
                    .unwrap_or_else(|_| QueryValue::Str(v.to_string()))
            }
        })*
    };
}

wide_int_query_value!(u64, usize, isize);

/// Ordered query parameters. `None` values are kept here but never
/// serialized, so optional filters can be passed straight through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, Option<QueryValue>)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.0.push((key.into(), Some(value.into())));
        self
    }

    pub fn set_opt<V: Into<QueryValue>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.0.push((key.into(), value.map(Into::into)));
        self
    }

    /// Defined entries, stringified, in insertion order.
    pub fn defined(&self) -> impl Iterator<Item = (&str, String)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v.to_query_string())))
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for Params
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        Params(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
        )
    }
}

/// Resolve `path` against `base` and apply `params`.
///
/// Each defined parameter replaces any same-named pair already in the query
/// (first position kept, duplicates dropped); new keys are appended. With no
/// defined parameters the joined URL is returned untouched.
pub fn build_url(base: &Url, path: &str, params: &Params) -> Result<Url, url::ParseError> {
    let mut url = base.join(path)?;

    let mut defined = params.defined().peekable();
    if defined.peek().is_none() {
        return Ok(url);
    }

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    for (key, value) in defined {
        match pairs.iter().position(|(k, _)| k == key) {
            Some(first) => {
                pairs[first].1 = value;
                let mut index = 0;
                pairs.retain(|(k, _)| {
                    let keep = index <= first || k != key;
                    index += 1;
                    keep
                });
            }
            None => pairs.push((key.to_string(), value)),
        }
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://analytics.example.com/api/").unwrap()
    }

    #[test]
    fn relative_path_joins_base() {
        let url = build_url(&base(), "websites", &Params::new()).unwrap();
        assert_eq!(url.as_str(), "https://analytics.example.com/api/websites");
    }

    #[test]
    fn absolute_path_replaces_base_path() {
        let url = build_url(&base(), "/websites", &Params::new()).unwrap();
        assert_eq!(url.as_str(), "https://analytics.example.com/websites");
    }

    #[test]
    fn absolute_url_overrides_authority() {
        let url = build_url(&base(), "https://other.example.org/x", &Params::new()).unwrap();
        assert_eq!(url.as_str(), "https://other.example.org/x");
    }

    #[test]
    fn undefined_params_are_dropped() {
        let params = Params::new()
            .set("startAt", 1_700_000_000_000_i64)
            .set_opt::<&str>("url", None)
            .set("unit", "day");
        let url = build_url(&base(), "stats", &params).unwrap();
        assert_eq!(url.query(), Some("startAt=1700000000000&unit=day"));
        assert!(!url.as_str().contains("undefined"));
    }

    #[test]
    fn only_undefined_params_leave_url_untouched() {
        let params = Params::new().set_opt::<i32>("page", None);
        let url = build_url(&base(), "websites", &params).unwrap();
        assert_eq!(url.as_str(), "https://analytics.example.com/api/websites");
    }

    #[test]
    fn scalars_stringify_naturally() {
        let params = Params::new()
            .set("a", true)
            .set("b", false)
            .set("c", 42_u32)
            .set("d", -7_i64)
            .set("e", 1.5_f64)
            .set("f", 2.0_f64);
        let url = build_url(&base(), "x", &params).unwrap();
        assert_eq!(url.query(), Some("a=true&b=false&c=42&d=-7&e=1.5&f=2"));
    }

    #[test]
    fn wide_integers_stringify_exactly() {
        let params = Params::new()
            .set("page", 3_usize)
            .set("offset", -4_isize)
            .set("big", u64::MAX);
        let url = build_url(&base(), "x", &params).unwrap();
        assert_eq!(url.query(), Some("page=3&offset=-4&big=18446744073709551615"));
        assert_eq!(QueryValue::from(7_u64), QueryValue::Int(7));
        assert_eq!(QueryValue::from(u64::MAX), QueryValue::Str("18446744073709551615".to_string()));
    }

    #[test]
    fn non_finite_floats() {
        assert_eq!(QueryValue::Float(f64::NAN).to_query_string(), "NaN");
        assert_eq!(QueryValue::Float(f64::INFINITY).to_query_string(), "Infinity");
        assert_eq!(QueryValue::Float(f64::NEG_INFINITY).to_query_string(), "-Infinity");
    }

    #[test]
    fn params_replace_existing_query_keys() {
        let params = Params::new().set("page", 2).set("q", "new");
        let url = build_url(&base(), "items?page=1&x=y&page=9", &params).unwrap();
        assert_eq!(url.query(), Some("page=2&x=y&q=new"));
    }

    #[test]
    fn later_param_with_same_key_wins() {
        let params = Params::new().set("k", "first").set("k", "second");
        let url = build_url(&base(), "x", &params).unwrap();
        assert_eq!(url.query(), Some("k=second"));
    }

    #[test]
    fn values_are_form_encoded() {
        let params = Params::new().set("url", "/a b?c=d&e");
        let url = build_url(&base(), "x", &params).unwrap();
        assert_eq!(url.query(), Some("url=%2Fa+b%3Fc%3Dd%26e"));
    }

    #[test]
    fn collects_from_iterator() {
        let params: Params = vec![("a", Some("1")), ("b", None), ("c", Some("3"))]
            .into_iter()
            .collect();
        let defined: Vec<_> = params.defined().collect();
        assert_eq!(defined, vec![("a", "1".to_string()), ("c", "3".to_string())]);
    }
}
