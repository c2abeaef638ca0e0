//! HTTP-POST binding.

use super::EncodedParams;

/// HTTP-POST binding encoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Renders an HTML page whose form posts the parameters to the
    /// destination as soon as it loads.
    ///
    /// A submit button is shown to users without JavaScript.
    #[must_use]
    pub fn form(destination: &str, params: &EncodedParams) -> String {
        let inputs: String = params
            .iter()
            .map(|(name, value)| {
                format!(
                    "\n        <input type=\"hidden\" name=\"{}\" value=\"{}\"/>",
                    html_escape(name),
                    html_escape(value)
                )
            })
            .collect();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML POST Binding</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">{inputs}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(destination)
        )
    }
}

/// Escapes text for an HTML attribute value.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_carries_every_parameter() {
        let mut params = EncodedParams::default();
        params.push("SAMLRequest", "PHNhbWw+");
        params.push("RelayState", "a\"b<c>");

        let html = HttpPostBinding::form("https://idp/sso?x=1&y=2", &params);

        assert!(html.contains(r#"action="https://idp/sso?x=1&amp;y=2""#));
        assert!(html.contains(r#"name="SAMLRequest" value="PHNhbWw+""#));
        assert!(html.contains(r#"name="RelayState" value="a&quot;b&lt;c&gt;""#));
        assert!(html.contains("document.forms[0].submit()"));
    }

    #[test]
    fn html_escape_all_specials() {
        assert_eq!(html_escape(r#"<&>"'"#), "&lt;&amp;&gt;&quot;&#x27;");
    }
}
