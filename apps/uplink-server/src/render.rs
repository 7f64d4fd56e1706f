//! Server-rendered markup: the upload page shell and error fragments.

use maud::{DOCTYPE, PreEscaped, html};

const STYLES: &str = r#"
body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 42rem; }
.text-center { text-align: center; }
.text-danger { color: #b00020; }
.text-muted { color: #666; }
.custom-file { margin-bottom: 1rem; }
.spinner-border { display: inline-block; width: 2rem; height: 2rem;
  border: .25em solid currentColor; border-right-color: transparent;
  border-radius: 50%; animation: spin .75s linear infinite; }
.sr-only { position: absolute; width: 1px; height: 1px; overflow: hidden; }
@keyframes spin { to { transform: rotate(360deg); } }
"#;

/// The upload page. A plain form post: it works without an open channel,
/// just without live progress.
pub fn upload_page() -> String {
    let markup = html! {
        (DOCTYPE)
        html lang="fr" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Uplink" }
                style { (PreEscaped(STYLES)) }
            }
            body {
                h1 { "Téléverser un fichier" }
                form id="upload-form" action="/view" method="post" enctype="multipart/form-data" {
                    div class="custom-file" {
                        input type="file" class="custom-file-input" id="file" name="file";
                        label class="custom-file-label" for="file" { "Choisir un fichier" }
                    }
                    button type="submit" { "Envoyer" }
                }
                div id="display" {}
            }
        }
    };
    markup.into_string()
}

/// Error fragment injected into the display region in place of a result.
pub fn error_fragment(message: &str) -> String {
    let markup = html! {
        div class="text-center" {
            p class="text-danger" { (message) }
        }
    };
    markup.into_string()
}
