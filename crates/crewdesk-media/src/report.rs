//! Combined report rendering.
//!
//! Specific report layouts (PDF, spreadsheet) belong to the surrounding
//! application; the pipeline only needs *a* renderer producing one artifact
//! file from the image, the transcription and the descriptive context. The
//! built-in renderer emits a self-contained HTML page with the same content
//! the product's PDF carries.

use std::fs;
use std::path::Path;

use crate::error::MediaResult;

/// Everything a renderer may embed in the combined report.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub company_name: String,
    pub tenant: String,
    /// Submission timestamp, preformatted for display
    pub timestamp: String,
    pub project_name: Option<String>,
    pub category_names: Vec<String>,
    pub transcription: String,
    /// Receipt image filename, relative to the report's own directory
    pub image_file: Option<String>,
}

/// Report layout seam.
pub trait ReportRenderer: Send + Sync {
    /// Render the combined report to `output`.
    fn render(&self, ctx: &ReportContext, output: &Path) -> MediaResult<()>;
}

/// Default renderer: one self-contained HTML page per receipt.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlReportRenderer;

impl ReportRenderer for HtmlReportRenderer {
    fn render(&self, ctx: &ReportContext, output: &Path) -> MediaResult<()> {
        let mut body = String::new();
        body.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        body.push_str(&format!("<title>{}</title>\n", escape(&ctx.company_name)));
        body.push_str(
            "<style>body{font-family:sans-serif;max-width:52rem;margin:2rem auto}\
             img{max-width:100%}h1{margin-bottom:0}.meta{color:#666;font-size:.85rem}\
             pre{white-space:pre-wrap;background:#f6f6f6;padding:1rem}</style>\n",
        );
        body.push_str("</head>\n<body>\n");
        body.push_str(&format!("<h1>{}</h1>\n", escape(&ctx.company_name)));
        body.push_str(&format!(
            "<p class=\"meta\">Date: {} &nbsp; Token: {}</p>\n",
            escape(&ctx.timestamp),
            escape(&ctx.tenant)
        ));
        if let Some(project) = &ctx.project_name {
            body.push_str(&format!("<p><strong>Job:</strong> {}</p>\n", escape(project)));
        }
        let categories: Vec<&str> = ctx
            .category_names
            .iter()
            .map(String::as_str)
            .filter(|name| !name.is_empty())
            .collect();
        if !categories.is_empty() {
            body.push_str(&format!(
                "<p><strong>Category:</strong> {}</p>\n",
                escape(&categories.join(", "))
            ));
        }
        if let Some(image) = &ctx.image_file {
            body.push_str("<h2>Receipt Image</h2>\n");
            body.push_str(&format!("<img src=\"{}\" alt=\"receipt\">\n", escape(image)));
        }
        body.push_str("<h2>Transcription</h2>\n");
        let text = if ctx.transcription.is_empty() {
            "[No transcription available]"
        } else {
            &ctx.transcription
        };
        body.push_str(&format!("<pre>{}</pre>\n", escape(text)));
        body.push_str("</body>\n</html>\n");

        fs::write(output, body)?;
        Ok(())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
