//! Terminal document rendering with a capability-probed fallback.
//!
//! The binary `.docx` writer is compiled in behind the `docx` cargo feature.
//! The capability is probed once per run, not per call, so behavior within a
//! run is deterministic. Rendering cannot fail: when the docx path is
//! unavailable the markdown fallback always succeeds.
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCapability {
    Docx,
    Markdown,
}

/// Probe which renderer this build carries.
pub fn probe() -> DocCapability {
    if cfg!(feature = "docx") {
        DocCapability::Docx
    } else {
        DocCapability::Markdown
    }
}

/// Render the terminal document, returning its artifact name and bytes.
pub fn render_final(capability: DocCapability, title: &str, body: &str) -> (String, Vec<u8>) {
    if capability == DocCapability::Docx {
        match render_docx(title, body) {
            Ok(artifact) => return artifact,
            Err(err) => {
                tracing::warn!(error = %err, "docx rendering unavailable, falling back to markdown");
            }
        }
    }
    (
        "S6_final.md".to_string(),
        format!("# {title}\n\n{body}").into_bytes(),
    )
}

#[cfg(feature = "docx")]
fn render_docx(title: &str, body: &str) -> Result<(String, Vec<u8>)> {
    use anyhow::Context;
    use docx_rs::{Docx, Paragraph, Run};

    let mut docx = Docx::new().add_paragraph(
        Paragraph::new()
            .add_run(Run::new().add_text(title))
            .style("Heading1"),
    );
    for line in body.lines() {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)));
    }

    let mut cursor = std::io::Cursor::new(Vec::new());
    docx.build().pack(&mut cursor).context("pack docx document")?;
    Ok(("S6_final.docx".to_string(), cursor.into_inner()))
}

#[cfg(not(feature = "docx"))]
fn render_docx(_title: &str, _body: &str) -> Result<(String, Vec<u8>)> {
    Err(anyhow::anyhow!("docx support not compiled into this build"))
}
