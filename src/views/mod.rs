//! Minimal HTML views
//!
//! Template engines are deliberately out of scope; the login page, the app
//! shell, and the error view are small inline documents, rendered the same
//! way regardless of which sub-path of the login tree was requested. The
//! CSRF token is exposed through a `<meta>` element so page scripts can
//! attach it as a request header.

use axum::response::{Html, IntoResponse, Response};
use http::StatusCode;

/// Escape a string for interpolation into HTML text or attribute values
fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// The login view, served for `/login`, `/login/*`, and `/logout` pages
#[must_use]
pub fn login_page(csrf_token: &str) -> Html<String> {
    let token = escape(csrf_token);
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="csrf-token" content="{token}">
    <title>Login</title>
</head>
<body>
    <h1>Login</h1>
    <form id="login-form">
        <div>
            <label for="username">Username:</label>
            <input type="text" id="username" name="username" required />
        </div>
        <div>
            <label for="password">Password:</label>
            <input type="password" id="password" name="password" required />
        </div>
        <button type="submit">Login</button>
    </form>
    <script>
    document.getElementById('login-form').addEventListener('submit', async (e) => {{
        e.preventDefault();
        const token = document.querySelector('meta[name="csrf-token"]').content;
        const res = await fetch('/api/login', {{
            method: 'POST',
            headers: {{ 'Content-Type': 'application/json', 'X-CSRF-Token': token }},
            body: JSON.stringify({{
                username: document.getElementById('username').value,
                password: document.getElementById('password').value,
            }}),
        }});
        if (res.ok) {{ window.location = '/'; }}
    }});
    </script>
</body>
</html>
"#
    ))
}

/// The single-page application shell, served for every authenticated page
#[must_use]
pub fn app_page(csrf_token: &str) -> Html<String> {
    let token = escape(csrf_token);
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="csrf-token" content="{token}">
    <title>App</title>
</head>
<body>
    <div id="app"></div>
    <p><a href="/logout">Logout</a></p>
</body>
</html>
"#
    ))
}

/// Human-readable error view for browser navigations
#[must_use]
pub fn error_page(status: StatusCode, url: &str, message: &str) -> Response {
    let code = status.as_u16();
    let url = escape(url);
    let message = escape(message);
    let body = Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Error {code}</title>
</head>
<body>
    <h1>{code}</h1>
    <p>{message}</p>
    <p><code>{url}</code></p>
    <p><a href="/login">Back to login</a></p>
</body>
</html>
"#
    ));
    (status, body).into_response()
}
