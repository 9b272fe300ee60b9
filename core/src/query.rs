//! List query options: pagination, sort, filter and expand.
//!
//! Expressions are passed through verbatim. The server's filter grammar uses
//! `&&`, `||`, comparison operators and quoted strings, so the URL only gets
//! the partial escaping done by [`escape`], never full percent-encoding.

/// Options for listing the records of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    page: u32,
    per_page: u32,
    skip_total_count: bool,
    sort: Option<String>,
    filter: Option<String>,
    expand: Option<String>,
}

impl Query {
    pub const DEFAULT_PER_PAGE: u32 = 500;

    /// First page of 500 items, with total counting skipped.
    pub fn new(sort: Option<&str>, filter: Option<&str>, expand: Option<&str>) -> Self {
        Self {
            page: 1,
            per_page: Self::DEFAULT_PER_PAGE,
            skip_total_count: true,
            sort: sort.map(str::to_string),
            filter: filter.map(str::to_string),
            expand: expand.map(str::to_string),
        }
    }

    /// An explicit page. Totals are counted. Zero is raised to one.
    pub fn paginated(
        page: u32,
        per_page: u32,
        sort: Option<&str>,
        filter: Option<&str>,
        expand: Option<&str>,
    ) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
            skip_total_count: false,
            ..Self::new(sort, filter, expand)
        }
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    pub fn skip_total(mut self, skip: bool) -> Self {
        self.skip_total_count = skip;
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn skips_total_count(&self) -> bool {
        self.skip_total_count
    }

    /// Render the unescaped query string, without the leading `?`.
    pub fn render(&self) -> String {
        let mut out = format!("page={}&perPage={}", self.page, self.per_page);
        if self.skip_total_count {
            out.push_str("&skipTotal=1");
        }
        for (key, expr) in [("sort", &self.sort), ("filter", &self.filter), ("expand", &self.expand)] {
            if let Some(expr) = expr {
                out.push('&');
                out.push_str(key);
                out.push('=');
                out.push_str(expr);
            }
        }
        out
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

/// Partially percent-encode a rendered query string.
///
/// Only space, `&&`, `|`, `<`, `>`, `-` and `"` are replaced. A lone `&` is a
/// parameter separator and stays as is.
pub fn escape(query: &str) -> String {
    query
        .replace(' ', "%20")
        .replace("&&", "%26%26")
        .replace('|', "%7C")
        .replace('<', "%3C")
        .replace('>', "%3E")
        .replace('-', "%2D")
        .replace('"', "%22")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preset_with_only_sort() {
        let query = Query::new(Some("-created"), None, None);
        assert_eq!(query.render(), "page=1&perPage=500&skipTotal=1&sort=-created");
    }

    #[test]
    fn paginated_preset_omits_skip_total() {
        let query = Query::paginated(2, 2, None, None, None);
        assert_eq!(query.render(), "page=2&perPage=2");
    }

    #[test]
    fn all_expressions_in_fixed_order() {
        let query = Query::paginated(1, 10, Some("title"), Some("views>5"), Some("author"));
        assert_eq!(
            query.render(),
            "page=1&perPage=10&sort=title&filter=views>5&expand=author"
        );
    }

    #[test]
    fn builder_methods_override_presets() {
        let query = Query::default().with_filter("a=1").skip_total(false);
        assert_eq!(query.render(), "page=1&perPage=500&filter=a=1");
        assert!(!query.skips_total_count());
    }

    #[test]
    fn zero_page_is_raised_to_one() {
        let query = Query::paginated(0, 0, None, None, None);
        assert_eq!((query.page(), query.per_page()), (1, 1));
    }

    #[test]
    fn escape_is_partial() {
        let rendered = Query::new(
            Some("-created"),
            Some(r#"title = "a b" && (views > 5 || views < 2)"#),
            None,
        )
        .render();
        assert_eq!(
            escape(&rendered),
            "page=1&perPage=500&skipTotal=1&sort=%2Dcreated\
             &filter=title%20=%20%22a%20b%22%20%26%26%20(views%20%3E%205%20%7C%7C%20views%20%3C%202)"
        );
    }
}
