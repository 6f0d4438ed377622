//! LaTeX inclusion snippets
//!
//! The snippet is what the next typesetting pass `\input`s in place of the
//! score. It references the merged PDF relative to the snippet's directory.

use std::path::Path;

use nota_types::Category;

/// Snippet text for a rendered score.
///
/// Examples include the whole artifact once; every other category
/// includes each page on its own line.
pub fn snippet_text(category: &Category, page_count: usize, artifact: &str) -> String {
    match category {
        Category::Example => {
            format!(
                "\\makebox[\\textwidth][c]{{\\includegraphics[scale=1]{{{}}}}}\n",
                artifact
            )
        }
        Category::Inline | Category::Fullscore | Category::Other(_) => (1..=page_count)
            .map(|page| {
                format!(
                    "\\makebox[\\textwidth][c]{{\\includegraphics[page={}, scale=1]{{{}}}}}\\par\n",
                    page, artifact
                )
            })
            .collect(),
    }
}

/// `artifact` as seen from the directory holding `snippet`, with `/`
/// separators as TeX expects. Falls back to the artifact path as given when
/// it does not live under that directory.
pub fn relative_reference(artifact: &Path, snippet: &Path) -> String {
    match snippet
        .parent()
        .and_then(|dir| artifact.strip_prefix(dir).ok())
    {
        Some(relative) => relative
            .iter()
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        None => artifact.to_string_lossy().replace('\\', "/"),
    }
}
