//! README and LICENSE text committed alongside the application

/// Project README describing the brief, the checks and the stack
pub fn readme(brief: &str, checks: &[String]) -> String {
    let mut out = String::new();
    out.push_str("# Auto-generated Application\n\n");
    out.push_str("## Brief\n\n");
    out.push_str(brief.trim());
    out.push_str("\n\n## Features / Checks\n\n");
    if checks.is_empty() {
        out.push_str("_No checks were supplied._\n");
    }
    for check in checks {
        out.push_str("- ");
        out.push_str(check);
        out.push('\n');
    }
    out.push_str(README_TAIL);
    out
}

const README_TAIL: &str = "
## Quick Start

### View online
Open the GitHub Pages URL reported when the application was deployed.

### Run locally
Open `index.html` in any modern browser. There is no build step.

## Tech Stack

- **Frontend**: HTML5, CSS3 and vanilla JavaScript in a single file
- **Styling**: Bootstrap 5.3 (CDN)
- **Icons**: Bootstrap Icons (CDN)
- **Hosting**: GitHub Pages

## Project Structure

```
.
├── index.html   # the whole application
├── README.md    # this file
└── LICENSE      # MIT license
```

## License

Released under the MIT License. See `LICENSE` for details.
";

/// MIT license text stamped with `year`
pub fn license_mit(year: i32) -> String {
    format!(
        "MIT License

Copyright (c) {year}

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the \"Software\"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
",
        year = year
    )
}
