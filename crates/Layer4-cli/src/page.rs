//! Single-page web UI

/// Default problem shown in the input box
pub const DEFAULT_TASK: &str = "Write a function to add two numbers";

/// Shown when the submitted problem is blank
pub const EMPTY_TASK_MESSAGE: &str = "Please enter a problem first.";

const STYLE: &str = r#"
body {
    margin: 0;
    min-height: 100vh;
    background: radial-gradient(circle at 20% 20%, #1e3c72 0%, #2a5298 35%, #0f2027 100%);
    background-attachment: fixed;
    color: #eef3fa;
    font-family: 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, 'Open Sans', 'Helvetica Neue', sans-serif;
    display: flex;
}
aside {
    width: 260px;
    padding: 1.5rem;
    background: linear-gradient(180deg, #0f2027, #203a43, #2c5364);
    border-right: 1px solid rgba(255,255,255,0.1);
    color: #e2ecf5;
}
main { flex: 1; padding: 2rem; max-width: 960px; }
.glass-card {
    background: rgba(255,255,255,0.07);
    backdrop-filter: blur(12px) saturate(160%);
    border: 1px solid rgba(255,255,255,0.15);
    padding: 1.2rem 1.4rem;
    border-radius: 18px;
    box-shadow: 0 8px 24px -6px rgba(0,0,0,0.45);
    margin-bottom: 1.2rem;
}
.main-title {font-size:3rem; font-weight:700; letter-spacing:1px; background: linear-gradient(90deg,#66d1ff,#ffb347,#ff6b6b); -webkit-background-clip:text; background-clip:text; color:transparent; text-align:center; margin: 0 0 0.4rem 0;}
.subtitle {text-align:center; font-size:1.1rem; color:#c7d6e6; margin-bottom:0.4rem;}
.msg-block {padding:0.75rem 1rem; border-radius:14px; margin-bottom:0.6rem; line-height:1.35; font-size:0.95rem; box-shadow:0 4px 12px -4px rgba(0,0,0,0.5);}
.msg-block b {font-weight:600; display:block; margin-bottom:0.2rem; letter-spacing:0.5px;}
.msg-content {white-space:pre-wrap; font-family: ui-monospace, Menlo, Consolas, monospace;}
.role-user {background:linear-gradient(135deg,#4e9af1,#3778c2); border:1px solid rgba(255,255,255,0.25);}
.role-agent {background:linear-gradient(135deg,#6a5af9,#8369ff); border:1px solid rgba(255,255,255,0.25);}
.role-exec {background:linear-gradient(135deg,#11998e,#38ef7d); border:1px solid rgba(255,255,255,0.25);}
.role-stop {background:linear-gradient(135deg,#ff512f,#dd2476); border:1px solid rgba(255,255,255,0.25);}
.role-error {background:linear-gradient(135deg,#f00000,#dc281e); border:1px solid rgba(255,255,255,0.25);}
label {display:block; margin-bottom:0.5rem;}
textarea {width:100%; box-sizing:border-box; height:140px; border-radius:14px; border:1px solid #3d5a80; padding:0.75rem; font-size:1rem;}
button {
    margin-top:0.8rem;
    background: linear-gradient(90deg,#ffe7a0,#ffca5f);
    color:#000; font-weight:700; letter-spacing:0.6px; border:0; border-radius:14px;
    padding:0.75rem 1.2rem; box-shadow:0 6px 18px -4px rgba(0,0,0,0.55); cursor:pointer;
}
button:hover {filter:brightness(1.05) saturate(1.15);}
button:disabled {filter:grayscale(0.8); cursor:wait;}
.warning {color:#ffca5f; margin-top:0.6rem; min-height:1.2rem;}
"#;

const SCRIPT: &str = r#"
const form = document.getElementById('dsa-form');
const output = document.getElementById('output');
const warning = document.getElementById('warning');
const button = document.getElementById('run');
let source = null;

form.addEventListener('submit', (e) => {
    e.preventDefault();
    const task = document.getElementById('task').value;
    if (!task.trim()) {
        warning.textContent = '__EMPTY__';
        return;
    }
    warning.textContent = '';
    if (source) source.close();

    output.innerHTML = '<div class="glass-card">⚙️ <b>Initializing agents &amp; sandbox...</b></div>';
    button.disabled = true;

    source = new EventSource('/api/run?task=' + encodeURIComponent(task));
    source.addEventListener('message', (ev) => {
        output.insertAdjacentHTML('beforeend', ev.data);
    });
    const finish = () => {
        source.close();
        source = null;
        button.disabled = false;
    };
    source.addEventListener('done', finish);
    source.onerror = finish;
});
"#;

/// Render the index page
pub fn index() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>AlgoGenie DSA Solver</title>
<style>{style}</style>
</head>
<body>
<aside>
<h3>🔍 Tips</h3>
<ul>
<li>Be specific in your problem.</li>
<li>Mention constraints if known.</li>
</ul>
<h3>🧰 Features</h3>
<ul>
<li>Multi-agent reasoning</li>
<li>Code execution in Docker</li>
<li>Streaming responses</li>
</ul>
</aside>
<main>
<div class="glass-card">
<div class="main-title">AlgoGenie DSA Solver</div>
<div class="subtitle">Interactive AI agents that help you reason, explain &amp; execute DSA problems.</div>
</div>
<form id="dsa-form" class="glass-card">
<label for="task">📝 Enter your DSA problem statement:</label>
<textarea id="task" name="task" placeholder="E.g., Given a binary tree, return its level-order traversal...">{task}</textarea>
<button id="run" type="submit">🚀 Run Solution</button>
<div id="warning" class="warning"></div>
</form>
<div id="output"></div>
</main>
<script>{script}</script>
</body>
</html>
"#,
        style = STYLE,
        task = html_escape::encode_text(DEFAULT_TASK),
        script = SCRIPT.replace("__EMPTY__", EMPTY_TASK_MESSAGE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_has_form_and_stream_client() {
        let page = index();
        assert!(page.contains("<title>AlgoGenie DSA Solver</title>"));
        assert!(page.contains(">Write a function to add two numbers</textarea>"));
        assert!(page.contains("🚀 Run Solution"));
        assert!(page.contains("new EventSource('/api/run?task='"));
        assert!(page.contains("'Please enter a problem first.'"));
        assert!(!page.contains("__EMPTY__"));
    }
}
