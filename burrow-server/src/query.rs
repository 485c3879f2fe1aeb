use hyper::{Body, Request};
use std::collections::HashMap;

use burrow_common::{Attrs, EngineError, EntityDetail, Filter, MessageDetail};

/// The query string of a request, parsed into a flat name -> value map.
///
/// TODO: add proper url param decoding; values containing a literal `&` or
/// `=` are not representable today, same as the underlying vocabulary never
/// needs them (ids, numbers, and the fixed `detail`/boolean enums).
pub(crate) struct Query {
    params: HashMap<String, String>,
}

impl Query {
    pub(crate) fn from_request(req: &Request<Body>) -> Self {
        let query = req.uri().query().unwrap_or("");
        let mut params = HashMap::new();
        for param in query.split('&') {
            if param.is_empty() {
                continue;
            }
            let mut i = param.splitn(2, '=');
            let name = i.next().unwrap_or("");
            let value = i.next().unwrap_or("");
            params.insert(name.to_string(), value.to_string());
        }
        Self { params }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    fn parse_u64(&self, key: &str) -> Result<Option<u64>, EngineError> {
        self.get(key)
            .map(|s| {
                s.parse()
                    .map_err(|_| EngineError::invalid_arguments(format!("invalid {} '{}'", key, s)))
            })
            .transpose()
    }

    fn parse_i64(&self, key: &str) -> Result<Option<i64>, EngineError> {
        self.get(key)
            .map(|s| {
                s.parse()
                    .map_err(|_| EngineError::invalid_arguments(format!("invalid {} '{}'", key, s)))
            })
            .transpose()
    }

    fn parse_bool(&self, key: &str) -> Result<bool, EngineError> {
        match self.get(key) {
            None => Ok(false),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(s) => Err(EngineError::invalid_arguments(format!("invalid {} '{}'", key, s))),
        }
    }

    /// Build the filter bundle accepted by every range operation.
    pub(crate) fn filter(&self) -> Result<Filter, EngineError> {
        Ok(Filter {
            marker:       self.get("marker").map(str::to_string),
            limit:        self.parse_u64("limit")?,
            match_hidden: self.parse_bool("match_hidden")?,
            wait:         self.parse_u64("wait")?.unwrap_or(0),
        })
    }

    /// Build the `ttl`/`hide` attribute bundle a creation or update carries.
    pub(crate) fn attrs(&self) -> Result<Attrs, EngineError> {
        Ok(Attrs {
            ttl:  self.parse_i64("ttl")?,
            hide: self.parse_i64("hide")?,
        })
    }

    /// Parse `detail` against the account/queue vocabulary, or fall back to
    /// `default` if the caller didn't supply one.
    pub(crate) fn entity_detail(&self, default: EntityDetail) -> Result<EntityDetail, EngineError> {
        match self.get("detail") {
            None => Ok(default),
            Some(s) => EntityDetail::parse(s),
        }
    }

    /// Parse `detail` against the message vocabulary, or fall back to
    /// `default` if the caller didn't supply one.
    pub(crate) fn message_detail(&self, default: MessageDetail) -> Result<MessageDetail, EngineError> {
        match self.get("detail") {
            None => Ok(default),
            Some(s) => MessageDetail::parse(s),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hyper::Request;

    fn req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn parses_filter_and_attrs() {
        let query = Query::from_request(&req("/v1.0/a/q?limit=5&marker=m1&match_hidden=true&ttl=10&hide=20&wait=3"));
        let filter = query.filter().unwrap();
        assert_eq!(filter.limit, Some(5));
        assert_eq!(filter.marker, Some("m1".to_string()));
        assert!(filter.match_hidden);
        assert_eq!(filter.wait, 3);
        let attrs = query.attrs().unwrap();
        assert_eq!(attrs.ttl, Some(10));
        assert_eq!(attrs.hide, Some(20));
    }

    #[test]
    fn missing_params_use_defaults() {
        let query = Query::from_request(&req("/v1.0/a/q"));
        let filter = query.filter().unwrap();
        assert_eq!(filter.limit, None);
        assert_eq!(filter.marker, None);
        assert!(!filter.match_hidden);
        assert_eq!(filter.wait, 0);
    }

    #[test]
    fn rejects_malformed_numbers() {
        let query = Query::from_request(&req("/v1.0/a/q?limit=not-a-number"));
        assert!(query.filter().is_err());
    }

    #[test]
    fn detail_falls_back_to_default() {
        let query = Query::from_request(&req("/v1.0/a"));
        assert_eq!(query.entity_detail(EntityDetail::Id).unwrap(), EntityDetail::Id);
        let query = Query::from_request(&req("/v1.0/a?detail=all"));
        assert_eq!(query.entity_detail(EntityDetail::Id).unwrap(), EntityDetail::All);
        let query = Query::from_request(&req("/v1.0/a?detail=bogus"));
        assert!(query.entity_detail(EntityDetail::Id).is_err());
    }
}
