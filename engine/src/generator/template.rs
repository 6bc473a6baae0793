//! Deterministic fallback page
//!
//! Used whenever the model is unavailable or returns something that is not a
//! complete HTML document. The output depends only on the brief, the checks
//! and the `generated_at` stamp, so two renders with the same inputs are
//! byte-identical.
//!
//! Every page carries the hello heading (`h1#hello`), a live date and time
//! region (`#current-date`, `#current-time`, `#date`) and the checklist. The
//! widget in the middle is picked by [`TemplateKind::classify`].

use chrono::{DateTime, Utc};
use html_escape::encode_text;

const TITLE_WORDS: usize = 8;
const DEFAULT_TITLE: &str = "Generated Application";

/// Widget variant chosen from keywords in the brief
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Captcha,
    SalesTable,
    MarkdownPreview,
    GithubLookup,
    HelloClock,
}

impl TemplateKind {
    /// Case-insensitive keyword match on the brief, first match wins
    pub fn classify(brief: &str) -> Self {
        let brief = brief.to_lowercase();
        if brief.contains("captcha") {
            TemplateKind::Captcha
        } else if brief.contains("csv") || brief.contains("sales") {
            TemplateKind::SalesTable
        } else if brief.contains("markdown") {
            TemplateKind::MarkdownPreview
        } else if brief.contains("github") && brief.contains("user") {
            TemplateKind::GithubLookup
        } else {
            TemplateKind::HelloClock
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TemplateKind::Captcha => "captcha",
            TemplateKind::SalesTable => "sales-table",
            TemplateKind::MarkdownPreview => "markdown-preview",
            TemplateKind::GithubLookup => "github-lookup",
            TemplateKind::HelloClock => "hello-clock",
        }
    }

    fn widget_html(self) -> &'static str {
        match self {
            TemplateKind::Captcha => CAPTCHA_HTML,
            TemplateKind::SalesTable => SALES_HTML,
            TemplateKind::MarkdownPreview => MARKDOWN_HTML,
            TemplateKind::GithubLookup => GITHUB_HTML,
            TemplateKind::HelloClock => "",
        }
    }

    fn widget_js(self) -> &'static str {
        match self {
            TemplateKind::Captcha => CAPTCHA_JS,
            TemplateKind::SalesTable => SALES_JS,
            TemplateKind::MarkdownPreview => MARKDOWN_JS,
            TemplateKind::GithubLookup => GITHUB_JS,
            TemplateKind::HelloClock => "",
        }
    }

    fn extra_head(self) -> &'static str {
        match self {
            TemplateKind::MarkdownPreview => {
                "  <script src=\"https://cdn.jsdelivr.net/npm/marked/marked.min.js\"></script>\n"
            }
            _ => "",
        }
    }
}

/// First eight words of the brief, or a generic title for an empty brief
pub fn title_for(brief: &str) -> String {
    let title = brief
        .split_whitespace()
        .take(TITLE_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    }
}

/// Render the complete fallback `index.html`
pub fn render_index(brief: &str, checks: &[String], generated_at: DateTime<Utc>) -> String {
    let kind = TemplateKind::classify(brief);
    let title = encode_text(&title_for(brief)).into_owned();

    let mut html = String::with_capacity(12 * 1024);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("  <meta charset=\"UTF-8\" />\n");
    html.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\" />\n");
    html.push_str(&format!("  <meta name=\"generator-template\" content=\"{}\" />\n", kind.label()));
    html.push_str(&format!("  <title>{}</title>\n", title));
    html.push_str(HEAD_LINKS);
    html.push_str(kind.extra_head());
    html.push_str(BASE_CSS);
    html.push_str("</head>\n<body>\n  <div class=\"container\">\n");

    html.push_str("    <div class=\"hero\">\n");
    html.push_str("      <h1 id=\"hello\">Hello World</h1>\n");
    html.push_str(&format!(
        "      <h2 class=\"h4 app-title\"><i class=\"bi bi-rocket-takeoff\"></i> {}</h2>\n",
        title
    ));
    html.push_str(&format!(
        "      <p class=\"lead text-muted\" id=\"brief\">{}</p>\n",
        multiline(brief)
    ));
    html.push_str("    </div>\n");

    html.push_str(DATE_HTML);
    html.push_str(kind.widget_html());

    html.push_str("    <div class=\"checks\">\n");
    html.push_str("      <h3 class=\"mb-3\"><i class=\"bi bi-list-check\"></i> Features &amp; Checks</h3>\n");
    html.push_str("      <ul class=\"list-group\" id=\"checks\">\n");
    for check in checks {
        html.push_str(&format!(
            "        <li class=\"list-group-item\"><i class=\"bi bi-check-circle text-success\"></i> {}</li>\n",
            encode_text(check)
        ));
    }
    html.push_str("      </ul>\n    </div>\n");

    html.push_str("    <div class=\"footer\">\n      <small class=\"text-muted\">\n");
    html.push_str(&format!(
        "        <i class=\"bi bi-calendar3\"></i> Generated on {}<br>\n",
        generated_at.format("%Y-%m-%dT%H:%M:%SZ")
    ));
    html.push_str("        <i class=\"bi bi-github\"></i> Hosted on GitHub Pages\n");
    html.push_str("      </small>\n    </div>\n  </div>\n\n");

    html.push_str(BOOTSTRAP_JS);
    html.push_str("  <script>\n");
    html.push_str(CLOCK_JS);
    html.push_str(kind.widget_js());
    html.push_str("    console.log('Application loaded successfully!');\n");
    html.push_str(&format!("    console.log('Checks:', {});\n", script_json(&checks)));
    html.push_str(&format!("    console.log('Brief:', {});\n", script_json(&brief)));
    html.push_str("  </script>\n</body>\n</html>\n");

    html
}

/// Escape text and keep its line breaks visible
fn multiline(text: &str) -> String {
    encode_text(text.trim()).replace('\n', "<br>\n")
}

/// JSON literal that is safe inside a `<script>` element
fn script_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

const HEAD_LINKS: &str = r#"  <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css" rel="stylesheet" />
  <link href="https://cdn.jsdelivr.net/npm/bootstrap-icons@1.10.0/font/bootstrap-icons.css" rel="stylesheet" />
"#;

const BOOTSTRAP_JS: &str = r#"  <script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/js/bootstrap.bundle.min.js"></script>
"#;

const BASE_CSS: &str = r#"  <style>
    body {
      padding: 2rem;
      background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
      min-height: 100vh;
    }
    .container {
      background: white;
      border-radius: 15px;
      padding: 3rem;
      box-shadow: 0 10px 40px rgba(0, 0, 0, 0.2);
      max-width: 860px;
    }
    .hero { text-align: center; margin-bottom: 2rem; }
    .hero h1 { color: #667eea; font-weight: bold; }
    .app-title { color: #495057; }
    .date-display {
      background: #f8f9fa;
      padding: 1.5rem;
      border-radius: 10px;
      margin: 2rem 0;
      text-align: center;
    }
    .date-display p { color: #6c757d; margin: 0.25rem 0; }
    .widget { margin: 2rem 0; }
    .checks { margin-top: 2rem; }
    .footer {
      margin-top: 3rem;
      padding-top: 2rem;
      border-top: 1px solid #dee2e6;
      text-align: center;
    }
  </style>
"#;

const DATE_HTML: &str = r#"    <div class="date-display" id="app">
      <p class="fs-4" id="current-date">Loading date...</p>
      <p class="fs-5" id="current-time">Loading time...</p>
      <p class="small">ISO date: <span id="date"></span></p>
    </div>
"#;

const CLOCK_JS: &str = r#"    function pad(n) { return String(n).padStart(2, '0'); }

    function updateDateTime() {
      const now = new Date();
      document.getElementById('current-date').textContent = now.toLocaleDateString('en-US', {
        weekday: 'long', year: 'numeric', month: 'long', day: 'numeric'
      });
      document.getElementById('current-time').textContent = now.toLocaleTimeString('en-US', {
        hour: '2-digit', minute: '2-digit', second: '2-digit', hour12: true
      });
      document.getElementById('date').textContent =
        now.getFullYear() + '-' + pad(now.getMonth() + 1) + '-' + pad(now.getDate());
    }

    updateDateTime();
    setInterval(updateDateTime, 1000);
"#;

const CAPTCHA_HTML: &str = r#"    <div class="widget card" id="captcha-solver">
      <div class="card-body">
        <h3 class="h5"><i class="bi bi-shield-lock"></i> Captcha</h3>
        <p class="text-muted small mb-2">Pass an image with <code>?url=</code>.</p>
        <img id="captcha-image" class="img-fluid border rounded mb-3" alt="captcha image" />
        <form id="captcha-form" class="input-group">
          <input id="captcha-answer" class="form-control" placeholder="Type the characters you see" />
          <button class="btn btn-primary" type="submit">Submit</button>
        </form>
        <p class="mt-3 mb-0">Solution: <strong id="solution">pending</strong></p>
      </div>
    </div>
"#;

const CAPTCHA_JS: &str = r#"    (function () {
      const params = new URLSearchParams(window.location.search);
      const url = params.get('url') || 'https://dummyimage.com/240x80/eeeeee/333333&text=AB12C';
      document.getElementById('captcha-image').src = url;
      document.getElementById('captcha-form').addEventListener('submit', function (event) {
        event.preventDefault();
        const answer = document.getElementById('captcha-answer').value.trim();
        document.getElementById('solution').textContent = answer || 'pending';
      });
    })();
"#;

const SALES_HTML: &str = r#"    <div class="widget" id="sales-summary">
      <h3 class="h5"><i class="bi bi-table"></i> Sales Summary</h3>
      <table class="table table-striped" id="sales-table">
        <thead><tr><th>Region</th><th>Product</th><th class="text-end">Sales</th></tr></thead>
        <tbody></tbody>
        <tfoot><tr><th colspan="2">Total</th><th class="text-end" id="total-sales">0</th></tr></tfoot>
      </table>
    </div>
"#;

const SALES_JS: &str = r#"    (function () {
      const rows = [
        { region: 'North', product: 'Widgets', sales: 1200.5 },
        { region: 'South', product: 'Gadgets', sales: 980.25 },
        { region: 'East', product: 'Widgets', sales: 1545.0 },
        { region: 'West', product: 'Gizmos', sales: 760.75 }
      ];
      const body = document.querySelector('#sales-table tbody');
      let total = 0;
      rows.forEach(function (row) {
        total += row.sales;
        const tr = document.createElement('tr');
        [row.region, row.product, row.sales.toFixed(2)].forEach(function (value, index) {
          const td = document.createElement('td');
          td.textContent = value;
          if (index === 2) td.className = 'text-end';
          tr.appendChild(td);
        });
        body.appendChild(tr);
      });
      document.getElementById('total-sales').textContent = total.toFixed(2);
    })();
"#;

const MARKDOWN_HTML: &str = r##"    <div class="widget" id="markdown-viewer">
      <h3 class="h5"><i class="bi bi-markdown"></i> Markdown</h3>
      <textarea id="markdown-input" class="form-control mb-3" rows="6"># Hello

Write **markdown** here.

- one
- two</textarea>
      <ul class="nav nav-tabs" role="tablist">
        <li class="nav-item"><button class="nav-link active" id="tab-preview" data-bs-toggle="tab" data-bs-target="#markdown-output" type="button">Preview</button></li>
        <li class="nav-item"><button class="nav-link" id="tab-source" data-bs-toggle="tab" data-bs-target="#markdown-source" type="button">Source</button></li>
      </ul>
      <div class="tab-content border border-top-0 p-3">
        <div class="tab-pane fade show active" id="markdown-output"></div>
        <pre class="tab-pane fade mb-0" id="markdown-source"></pre>
      </div>
    </div>
"##;

const MARKDOWN_JS: &str = r#"    (function () {
      const input = document.getElementById('markdown-input');
      function escapeHtml(text) {
        return text.replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;');
      }
      function render() {
        const source = input.value;
        const html = window.marked ? window.marked.parse(source) : '<pre>' + escapeHtml(source) + '</pre>';
        document.getElementById('markdown-output').innerHTML = html;
        document.getElementById('markdown-source').textContent = html;
      }
      input.addEventListener('input', render);
      render();
    })();
"#;

const GITHUB_HTML: &str = r#"    <div class="widget card" id="github-lookup">
      <div class="card-body">
        <h3 class="h5"><i class="bi bi-github"></i> GitHub User Lookup</h3>
        <form id="github-user-form" class="input-group">
          <input id="username" class="form-control" placeholder="octocat" required />
          <button class="btn btn-dark" type="submit">Look up</button>
        </form>
        <div id="github-status" class="mt-3" aria-live="polite"></div>
        <dl class="row mt-3 mb-0">
          <dt class="col-sm-4">Name</dt><dd class="col-sm-8" id="github-name">-</dd>
          <dt class="col-sm-4">Created</dt><dd class="col-sm-8" id="github-created-at">-</dd>
          <dt class="col-sm-4">Public repos</dt><dd class="col-sm-8" id="github-repos">-</dd>
        </dl>
      </div>
    </div>
"#;

const GITHUB_JS: &str = r#"    (function () {
      const status = document.getElementById('github-status');
      document.getElementById('github-user-form').addEventListener('submit', async function (event) {
        event.preventDefault();
        const username = document.getElementById('username').value.trim();
        if (!username) return;
        status.textContent = 'Looking up ' + username + '...';
        try {
          const response = await fetch('https://api.github.com/users/' + encodeURIComponent(username));
          if (!response.ok) throw new Error('HTTP ' + response.status);
          const user = await response.json();
          document.getElementById('github-name').textContent = user.name || user.login;
          document.getElementById('github-created-at').textContent = (user.created_at || '').slice(0, 10);
          document.getElementById('github-repos').textContent = user.public_repos;
          status.textContent = 'Found ' + user.login;
        } catch (error) {
          status.textContent = 'Lookup failed: ' + error.message;
        }
      });
    })();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_classify_first_match_wins() {
        assert_eq!(TemplateKind::classify("Solve a CAPTCHA from sales data"), TemplateKind::Captcha);
        assert_eq!(TemplateKind::classify("Sum the sales column"), TemplateKind::SalesTable);
        assert_eq!(TemplateKind::classify("Parse data.csv"), TemplateKind::SalesTable);
        assert_eq!(TemplateKind::classify("Render Markdown to HTML"), TemplateKind::MarkdownPreview);
        assert_eq!(TemplateKind::classify("Show a GitHub user's creation date"), TemplateKind::GithubLookup);
        assert_eq!(TemplateKind::classify("Link to my GitHub profile"), TemplateKind::HelloClock);
        assert_eq!(TemplateKind::classify("Hello World"), TemplateKind::HelloClock);
    }

    #[test]
    fn test_title_is_first_eight_words() {
        assert_eq!(
            title_for("Create a Hello World page showing today's date in a big font"),
            "Create a Hello World page showing today's date"
        );
        assert_eq!(title_for("   "), "Generated Application");
    }

    #[test]
    fn test_hello_page_structure() {
        let html = render_index(
            "Create a Hello World page showing today's date",
            &["Page has h1#hello".to_string()],
            fixed_time(),
        );
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
        assert!(html.contains("<h1 id=\"hello\">"));
        assert!(html.contains("id=\"current-date\""));
        assert!(html.contains("id=\"current-time\""));
        assert!(html.contains("Page has h1#hello</li>"));
        assert!(html.contains("Generated on 2025-10-01T12:00:00Z"));
        assert!(!html.contains("id=\"sales-table\""));
    }

    #[test]
    fn test_widgets_follow_kind() {
        let sales = render_index("Summarise sales.csv", &[], fixed_time());
        assert!(sales.contains("id=\"total-sales\""));

        let markdown = render_index("Convert markdown", &[], fixed_time());
        assert!(markdown.contains("id=\"markdown-output\""));
        assert!(markdown.contains("marked.min.js"));

        let github = render_index("Look up a GitHub user", &[], fixed_time());
        assert!(github.contains("id=\"github-user-form\""));
        assert!(github.contains("https://api.github.com/users/"));
    }

    #[test]
    fn test_text_is_escaped() {
        let html = render_index(
            "<script>alert(1)</script> page",
            &["<b>bold</b> & more".to_string()],
            fixed_time(),
        );
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; page"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt; &amp; more"));
        assert!(!html.contains("<script>alert(1)</script>"));
        // JSON copy inside the script element cannot close it
        assert!(html.contains(r#"console.log('Brief:', "<script>alert(1)<\/script> page");"#));
    }

    #[test]
    fn test_render_is_deterministic() {
        let checks = vec!["a".to_string(), "b".to_string()];
        let first = render_index("Same brief", &checks, fixed_time());
        let second = render_index("Same brief", &checks, fixed_time());
        assert_eq!(first, second);
    }
}
