use crate::generator::Combination;

#[derive(Clone, Debug)]
pub struct RequestTemplate {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

// plain literal replacement, placeholders are applied in declaration order.
// values are not encoded for the position they land in.
pub fn render_text(text: &str, combination: &Combination) -> String {
    let mut out = text.to_string();
    for (placeholder, value) in combination.iter() {
        if out.contains(placeholder) {
            out = out.replace(placeholder, value);
        }
    }
    out
}

impl RequestTemplate {
    pub fn render(&self, combination: &Combination) -> RenderedRequest {
        RenderedRequest {
            method: self.method.clone(),
            url: render_text(&self.url, combination),
            headers: self
                .headers
                .iter()
                .map(|(k, v)| (render_text(k, combination), render_text(v, combination)))
                .collect(),
            body: self.body.as_ref().map(|b| render_text(b, combination)),
        }
    }

    pub fn used_placeholders<'a>(&self, placeholders: &'a [String]) -> Vec<&'a str> {
        placeholders
            .iter()
            .filter(|p| {
                self.url.contains(p.as_str())
                    || self
                        .headers
                        .iter()
                        .any(|(k, v)| k.contains(p.as_str()) || v.contains(p.as_str()))
                    || self
                        .body
                        .as_deref()
                        .map(|b| b.contains(p.as_str()))
                        .unwrap_or(false)
            })
            .map(|p| p.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo() -> Combination {
        Combination::from_pairs([("FUZZ1", "admin"), ("FUZZ2", "1")])
    }

    #[test]
    fn replaces_every_occurrence() {
        let out = render_text("/FUZZ1/FUZZ2?u=FUZZ1", &combo());
        assert_eq!(out, "/admin/1?u=admin");
    }

    #[test]
    fn missing_placeholder_is_a_no_op() {
        assert_eq!(render_text("/static/index.html", &combo()), "/static/index.html");
    }

    #[test]
    fn values_are_not_encoded() {
        let c = Combination::from_pairs([("FUZZ", "a b/../?x=1&y")]);
        assert_eq!(render_text("http://t/FUZZ", &c), "http://t/a b/../?x=1&y");
    }

    #[test]
    fn renders_url_headers_and_body_independently() {
        let template = RequestTemplate {
            method: reqwest::Method::POST,
            url: "http://target.tld/FUZZ1".to_string(),
            headers: vec![
                ("X-FUZZ2".to_string(), "token FUZZ2".to_string()),
                ("Accept".to_string(), "*/*".to_string()),
            ],
            body: Some("user=FUZZ1&id=FUZZ2".to_string()),
        };
        let rendered = template.render(&combo());
        assert_eq!(rendered.method, reqwest::Method::POST);
        assert_eq!(rendered.url, "http://target.tld/admin");
        assert_eq!(
            rendered.headers,
            vec![
                ("X-1".to_string(), "token 1".to_string()),
                ("Accept".to_string(), "*/*".to_string()),
            ]
        );
        assert_eq!(rendered.body.as_deref(), Some("user=admin&id=1"));
    }

    #[test]
    fn used_placeholders_scans_every_position() {
        let template = RequestTemplate {
            method: reqwest::Method::GET,
            url: "http://target.tld/A".to_string(),
            headers: vec![("Cookie".to_string(), "s=C".to_string())],
            body: None,
        };
        let declared = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(template.used_placeholders(&declared), vec!["A", "C"]);
    }
}
