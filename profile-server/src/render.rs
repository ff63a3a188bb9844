//! Token substitution for the profile page.
//!
//! The page is a static HTML file with `{{...}}` placeholders. Rendering
//! fills them from a profile (or blanks) and the list of known emails.

use profile_store::Profile;

pub const TOKEN_EMAIL: &str = "{{EMAIL}}";
pub const TOKEN_NAME: &str = "{{NAME}}";
pub const TOKEN_ADDRESS: &str = "{{ADDRESS}}";
pub const TOKEN_EMAIL_OPTIONS: &str = "{{EMAIL_OPTIONS}}";

/// Substitute every placeholder in `page`. With no profile the field tokens
/// become empty strings; the option list always reflects `emails`.
pub fn render_page(page: &str, profile: Option<&Profile>, emails: &[String]) -> String {
    let (email, name, address) = match profile {
        Some(p) => (
            p.email.as_str(),
            p.name.as_deref().unwrap_or(""),
            p.address.as_deref().unwrap_or(""),
        ),
        None => ("", "", ""),
    };

    page.replace(TOKEN_EMAIL_OPTIONS, &email_options(emails, email))
        .replace(TOKEN_EMAIL, &escape(email))
        .replace(TOKEN_NAME, &escape(name))
        .replace(TOKEN_ADDRESS, &escape(address))
}

/// One `<option>` per known email, marking the loaded profile as selected.
fn email_options(emails: &[String], selected: &str) -> String {
    let mut out = String::new();
    for email in emails {
        let escaped = escape(email);
        let marker = if email == selected { " selected" } else { "" };
        out.push_str(&format!(
            "<option value=\"{escaped}\"{marker}>{escaped}</option>\n"
        ));
    }
    out
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
