use askama::Template;

#[derive(Template)]
#[template(path = "mail/integration_disabled.html")]
struct IntegrationDisabled<'a> {
    destination: &'a str,
    form_name: &'a str,
}

pub fn render_integration_disabled(destination: &str, form_name: &str) -> Result<String, String> {
    IntegrationDisabled {
        destination,
        form_name,
    }
    .render()
    .map_err(|e| format!("Failed to render notification: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_destination_and_form() {
        let html = render_integration_disabled("Google Sheets", "Contact <us>").unwrap();
        assert!(html.contains("Your Google Sheets integration was disabled"));
        assert!(html.contains("Contact &#60;us&#62;") || html.contains("Contact &lt;us&gt;"));
    }
}
