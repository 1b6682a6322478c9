//! Home page

use axum::response::Html;

const HOME_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>tardy</title>
  <link rel="stylesheet" href="/static/css/home.css">
</head>
<body>
  <h1>tardy</h1>
  <p>How late do you finish your tasks? <a href="/login">Log in</a> to find out.</p>
  <p id="status">Loading&hellip;</p>
  <table>
    <thead>
      <tr><th>Task</th><th>Due</th><th>Completed</th><th>Days late</th></tr>
    </thead>
    <tbody id="report-body"></tbody>
  </table>
  <form method="post" action="/logout">
    <button type="submit">Log out</button>
  </form>
  <script src="/static/js/home.js"></script>
</body>
</html>
"#;

pub(super) async fn home_page() -> Html<&'static str> {
    Html(HOME_PAGE)
}
