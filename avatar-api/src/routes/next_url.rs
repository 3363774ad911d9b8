use axum::http::{header, HeaderMap, Uri};

/// Where to send the user after a form has been handled.
///
/// Tried in order: `next` from the submitted form, `next` from the query
/// string, the `Referer` header, and finally the path of the current request.
pub fn resolve_next(
    form_next: Option<&str>,
    query_next: Option<&str>,
    headers: &HeaderMap,
    uri: &Uri,
) -> String {
    let referer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok());

    [form_next, query_next, referer]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uri.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_referer(referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_str(referer).unwrap());
        headers
    }

    #[test]
    fn form_next_wins() {
        let uri: Uri = "/avatar/change/?next=/query".parse().unwrap();
        let next = resolve_next(
            Some("/form"),
            Some("/query"),
            &headers_with_referer("/referer"),
            &uri,
        );
        assert_eq!(next, "/form");
    }

    #[test]
    fn query_next_then_referer() {
        let uri: Uri = "/avatar/change/".parse().unwrap();
        let headers = headers_with_referer("/referer");

        assert_eq!(resolve_next(None, Some("/query"), &headers, &uri), "/query");
        assert_eq!(resolve_next(Some(""), None, &headers, &uri), "/referer");
    }

    #[test]
    fn falls_back_to_request_path() {
        let uri: Uri = "/avatar/delete/?x=1".parse().unwrap();
        assert_eq!(
            resolve_next(None, None, &HeaderMap::new(), &uri),
            "/avatar/delete/"
        );
    }
}
