//! Viewer and control pages
//!
//! Both pages are embedded. When `server.static_dir` is set, `viewer.html`
//! and `control.html` from that directory take precedence.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
};
use tracing::warn;

use super::GatewayState;

const VIEWER_FILE: &str = "viewer.html";
const CONTROL_FILE: &str = "control.html";

/// `GET /` and `GET /index.html`
pub(super) async fn viewer(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let page = if state.session.is_running() {
        load(state.static_dir.as_deref(), VIEWER_FILE, VIEWER_HTML).await
    } else {
        Cow::Borrowed(WAITING_HTML)
    };
    ([(header::CACHE_CONTROL, "no-cache")], Html(page))
}

/// `GET /project`
pub(super) async fn control(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let page = load(state.static_dir.as_deref(), CONTROL_FILE, CONTROL_HTML).await;
    ([(header::CACHE_CONTROL, "no-cache")], Html(page))
}

async fn load(dir: Option<&Path>, file: &str, embedded: &'static str) -> Cow<'static, str> {
    let Some(dir) = dir else {
        return Cow::Borrowed(embedded);
    };

    let path = dir.join(file);
    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Cow::Owned(page),
        Err(e) => {
            warn!("Failed to read {}: {}, using built-in page", path.display(), e);
            Cow::Borrowed(embedded)
        }
    }
}

/// Served at `/` while nothing is shared
pub(crate) const WAITING_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Projector</title>
    <style>
        body {
            margin: 0;
            height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            background: #0a0a0a;
            color: #888;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        }
    </style>
</head>
<body>
    <p>Screen sharing is not active yet. Ask the presenter to start sharing.</p>
    <script>
        setInterval(async () => {
            try {
                const res = await fetch('/api/status');
                const status = await res.json();
                if (status.running) location.reload();
            } catch (e) {}
        }, 2000);
    </script>
</body>
</html>
"#;

/// Embedded HLS viewer page
pub(crate) const VIEWER_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Projector</title>
    <style>
        html, body {
            margin: 0;
            height: 100%;
            background: #000;
        }
        video {
            width: 100%;
            height: 100%;
            object-fit: contain;
            background: #000;
        }
        .status {
            position: fixed;
            bottom: 12px;
            left: 12px;
            color: #888;
            font: 13px -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        }
    </style>
    <script src="https://cdn.jsdelivr.net/npm/hls.js@1"></script>
</head>
<body>
    <video id="video" autoplay playsinline muted controls></video>
    <div class="status" id="status">Connecting...</div>
    <script>
        const src = '/hls/stream.m3u8';
        const video = document.getElementById('video');
        const statusEl = document.getElementById('status');

        function attach() {
            if (window.Hls && Hls.isSupported()) {
                const hls = new Hls({ liveSyncDurationCount: 2, manifestLoadingMaxRetry: 30 });
                hls.loadSource(src);
                hls.attachMedia(video);
                hls.on(Hls.Events.MANIFEST_PARSED, () => {
                    statusEl.textContent = '';
                    video.play().catch(() => {});
                });
                hls.on(Hls.Events.ERROR, (_, data) => {
                    if (!data.fatal) return;
                    statusEl.textContent = 'Reconnecting...';
                    if (data.type === Hls.ErrorTypes.MEDIA_ERROR) {
                        hls.recoverMediaError();
                    } else {
                        hls.destroy();
                        setTimeout(attach, 2000);
                    }
                });
            } else if (video.canPlayType('application/vnd.apple.mpegurl')) {
                video.src = src;
                video.addEventListener('loadedmetadata', () => {
                    statusEl.textContent = '';
                    video.play().catch(() => {});
                });
            } else {
                statusEl.textContent = 'This browser cannot play HLS';
            }
        }

        setInterval(async () => {
            try {
                const res = await fetch('/api/status');
                const status = await res.json();
                if (!status.running) location.reload();
            } catch (e) {}
        }, 3000);

        attach();
    </script>
</body>
</html>
"#;

/// Embedded presenter control page
pub(crate) const CONTROL_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Projector Control</title>
    <style>
        body {
            margin: 0;
            padding: 20px;
            background: #1a1a1a;
            color: #fff;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        }
        .container {
            max-width: 640px;
            margin: 0 auto;
        }
        h1 {
            color: #7c3aed;
            margin-bottom: 20px;
        }
        select, button {
            font-size: 16px;
            padding: 10px;
            border-radius: 4px;
            margin-right: 10px;
        }
        button {
            background: #7c3aed;
            color: white;
            border: none;
            cursor: pointer;
        }
        button:hover { background: #6d28d9; }
        button:disabled { background: #4a4a4a; cursor: not-allowed; }
        .status {
            margin: 20px 0;
            padding: 10px;
            background: #2a2a2a;
            border-radius: 4px;
        }
        .running { color: #22c55e; }
        .idle { color: #888; }
        .error { color: #ef4444; }
        a { color: #a78bfa; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Projector</h1>
        <select id="source"></select>
        <button id="start" onclick="start()">Start sharing</button>
        <button id="stop" onclick="stop()" disabled>Stop</button>
        <div class="status">
            Status: <span id="state" class="idle">idle</span>
            <div id="url"></div>
            <div id="message" class="error"></div>
        </div>
    </div>
    <script>
        const sourceEl = document.getElementById('source');
        const stateEl = document.getElementById('state');
        const urlEl = document.getElementById('url');
        const messageEl = document.getElementById('message');
        const startBtn = document.getElementById('start');
        const stopBtn = document.getElementById('stop');

        function showError(body) {
            messageEl.textContent = body.message + (body.hint ? ' (' + body.hint + ')' : '');
        }

        async function loadSources() {
            const res = await fetch('/api/sources');
            const body = await res.json();
            if (!res.ok) {
                showError(body);
                return;
            }
            sourceEl.innerHTML = '';
            for (const screen of body.screens) {
                const opt = document.createElement('option');
                opt.value = screen.id;
                opt.textContent = screen.label;
                sourceEl.appendChild(opt);
            }
        }

        async function refresh() {
            try {
                const res = await fetch('/api/status');
                const status = await res.json();
                stateEl.textContent = status.state;
                stateEl.className = status.running ? 'running' : 'idle';
                startBtn.disabled = status.state !== 'idle';
                stopBtn.disabled = status.state === 'idle';
                urlEl.innerHTML = status.viewer_url
                    ? 'Viewers: <a href="' + status.viewer_url + '" target="_blank">' + status.viewer_url + '</a>'
                    : '';
            } catch (e) {
                stateEl.textContent = 'server unreachable';
                stateEl.className = 'error';
            }
        }

        async function start() {
            messageEl.textContent = '';
            startBtn.disabled = true;
            const res = await fetch('/api/start', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ id: sourceEl.value || null })
            });
            if (!res.ok) showError(await res.json());
            refresh();
        }

        async function stop() {
            messageEl.textContent = '';
            stopBtn.disabled = true;
            const res = await fetch('/api/stop', { method: 'POST' });
            const body = await res.json();
            if (body.error) showError({ message: body.detail });
            refresh();
        }

        loadSources();
        refresh();
        setInterval(refresh, 2000);
    </script>
</body>
</html>
"#;
