//! UI route - single HTML page for the attendance ingest workflow
//!
//! Vanilla JS, no frameworks. All state lives on the server; the page
//! renders `/session` and `/records` and refreshes on SSE events.

use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

use crate::AppState;

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new().route("/", get(root_page))
}

async fn root_page() -> impl IntoResponse {
    Html(PAGE.replace("{{VERSION}}", env!("CARGO_PKG_VERSION")))
}

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Attendance Ingest</title>
    <style>
        body {
            font-family: system-ui, -apple-system, sans-serif;
            max-width: 1200px;
            margin: 30px auto;
            padding: 0 20px;
            line-height: 1.5;
            color: #333;
        }
        h1 {
            border-bottom: 2px solid #0066cc;
            padding-bottom: 8px;
        }
        .button {
            padding: 8px 18px;
            background: #0066cc;
            color: white;
            border: none;
            border-radius: 4px;
            cursor: pointer;
            margin: 4px;
        }
        .button:hover { background: #0052a3; }
        .button.secondary { background: #666; }
        .button:disabled { background: #aaa; cursor: default; }
        .entries { display: flex; flex-wrap: wrap; gap: 12px; margin: 16px 0; }
        .entry {
            width: 160px;
            border: 1px solid #ddd;
            border-radius: 4px;
            padding: 6px;
            font-size: 0.85em;
            position: relative;
        }
        .entry img { width: 100%; height: 100px; object-fit: cover; }
        .entry .doc { height: 100px; display: flex; align-items: center; justify-content: center; background: #f3f3f3; }
        .entry .remove { position: absolute; top: 2px; right: 4px; cursor: pointer; color: #c00; }
        .status-pending { color: #888; }
        .status-processing { color: #0066cc; }
        .status-completed { color: #2a8a2a; }
        .status-error { color: #c00; }
        .progress { height: 14px; background: #eee; border-radius: 7px; overflow: hidden; }
        .progress div { height: 100%; background: #0066cc; transition: width 0.3s; }
        .error-box { background: #fdecea; border: 1px solid #c00; padding: 10px; border-radius: 4px; }
        .toasts { position: fixed; bottom: 20px; right: 20px; }
        .toast { background: #333; color: white; padding: 8px 14px; border-radius: 4px; margin-top: 6px; }
        .summary span { margin-right: 18px; }
        table { border-collapse: collapse; width: 100%; font-size: 0.85em; }
        th, td { border: 1px solid #ddd; padding: 4px 6px; }
        th { background: #f3f3f3; position: sticky; top: 0; }
        td.editable { cursor: pointer; }
        td.editing { outline: 2px solid #0066cc; }
        .hidden { display: none; }
        footer { margin-top: 30px; font-size: 0.8em; color: #888; }
    </style>
</head>
<body>
    <h1>Attendance Ingest</h1>

    <section id="upload-view">
        <input type="file" id="file-input" multiple accept="image/*,application/pdf">
        <div class="entries" id="entries"></div>
        <div id="progress-wrap" class="hidden">
            <div class="progress"><div id="progress-bar" style="width:0%"></div></div>
            <p id="progress-text"></p>
        </div>
        <button class="button" id="analyze">Analyze</button>
        <button class="button secondary" id="reset">Start over</button>
    </section>

    <section id="error-view" class="hidden">
        <p class="error-box" id="error-text"></p>
    </section>

    <section id="results-view" class="hidden">
        <p class="summary" id="summary"></p>
        <p>
            <input type="text" id="filename" placeholder="attendance_YYYY-MM-DD">
            <button class="button" data-export="csv">CSV</button>
            <button class="button" data-export="xlsx">Excel</button>
            <button class="button secondary" id="copy">Copy</button>
        </p>
        <div style="overflow:auto; max-height:600px">
            <table id="records"></table>
        </div>
    </section>

    <div class="toasts" id="toasts"></div>
    <footer>rollcall-ai {{VERSION}}</footer>

    <script>
        const $ = (id) => document.getElementById(id);
        let session = null;
        let table = null;

        async function api(method, path, body) {
            const options = { method };
            if (body instanceof FormData) {
                options.body = body;
            } else if (body !== undefined) {
                options.headers = { 'Content-Type': 'application/json' };
                options.body = JSON.stringify(body);
            }
            const response = await fetch(path, options);
            const data = await response.json().catch(() => ({}));
            if (!response.ok && data.error) {
                toast(data.error.message);
            }
            return data;
        }

        function toast(message) {
            const el = document.createElement('div');
            el.className = 'toast';
            el.textContent = message;
            $('toasts').appendChild(el);
            setTimeout(() => el.remove(), 5000);
        }

        function renderSession(data) {
            session = data;
            const loading = data.phase === 'loading';

            $('entries').innerHTML = '';
            for (const entry of data.entries) {
                const card = document.createElement('div');
                card.className = 'entry';
                const preview = entry.is_image
                    ? `<img src="${entry.preview}" alt="">`
                    : `<div class="doc">PDF</div>`;
                card.innerHTML = `${preview}
                    <div>${escapeHtml(entry.file_name)}</div>
                    <div class="status-${entry.status}">${entry.status}${entry.error ? ': ' + escapeHtml(entry.error) : ''}</div>`;
                if (!loading) {
                    const remove = document.createElement('span');
                    remove.className = 'remove';
                    remove.textContent = 'x';
                    remove.onclick = () => api('DELETE', `/files/${entry.hash}`).then(refresh);
                    card.appendChild(remove);
                }
                $('entries').appendChild(card);
            }

            $('progress-wrap').classList.toggle('hidden', !loading);
            $('progress-bar').style.width = `${data.progress.percentage}%`;
            $('progress-text').textContent =
                `${data.progress.percentage}% (${data.progress.finished}/${data.progress.total} files)`;

            $('analyze').disabled = loading;
            $('file-input').disabled = loading;
            $('error-view').classList.toggle('hidden', data.phase !== 'error');
            $('error-text').textContent = data.error || '';
            $('results-view').classList.toggle('hidden', data.phase !== 'results');

            if (data.phase === 'results') {
                loadRecords();
            }
        }

        function escapeHtml(text) {
            const div = document.createElement('div');
            div.textContent = text;
            return div.innerHTML;
        }

        async function loadRecords() {
            table = await api('GET', '/records');
            renderRecords();
        }

        function renderRecords() {
            const s = table.summary;
            $('summary').innerHTML =
                `<span>Attendees: ${s.total_attendees}</span><span>PWDs: ${s.total_pwds}</span>` +
                `<span>Employed: ${s.total_employed}</span><span>Unemployed: ${s.total_unemployed}</span>` +
                `<span>Self-employed: ${s.total_self_employed}</span>`;

            const header = table.columns.map(c => `<th>${c.label}</th>`).join('');
            const rows = table.records.map(record => {
                const cells = table.columns.map(c => {
                    const editing = table.edit_cursor
                        && table.edit_cursor.record_id === record.id
                        && table.edit_cursor.column === c.column;
                    const cls = c.kind === 'read_only' ? '' : (editing ? 'editable editing' : 'editable');
                    return `<td class="${cls}" data-id="${escapeHtml(record.id)}" data-column="${c.column}">` +
                        (editing ? editorFor(c, record[c.column]) : escapeHtml(record[c.column] || '')) +
                        `</td>`;
                }).join('');
                return `<tr>${cells}</tr>`;
            }).join('');
            $('records').innerHTML = `<thead><tr>${header}</tr></thead><tbody>${rows}</tbody>`;

            const input = $('records').querySelector('input, select');
            if (input) {
                input.focus();
            }
        }

        function editorFor(column, value) {
            if (column.kind === 'choice') {
                const options = column.options.map(o =>
                    `<option value="${escapeHtml(o.value)}" ${o.value === value ? 'selected' : ''}>${escapeHtml(o.label)}</option>`
                ).join('');
                return `<select data-role="choice">${options}</select>`;
            }
            const draft = table.edit_cursor.draft ?? value ?? '';
            return `<input data-role="text" value="${escapeHtml(draft)}">`;
        }

        // Set between mousedown and click inside the table; opening another
        // cell commits the open one server-side
        let switching = false;
        $('records').addEventListener('mousedown', () => { switching = true; });

        $('records').addEventListener('click', async (e) => {
            switching = false;
            const td = e.target.closest('td.editable');
            if (!td || td.classList.contains('editing')) {
                return;
            }
            await api('POST', '/records/edit/begin', { record_id: td.dataset.id, column: td.dataset.column });
            await loadRecords();
        });

        $('records').addEventListener('input', (e) => {
            if (e.target.dataset.role === 'text') {
                api('POST', '/records/edit/input', { value: e.target.value });
            }
        });

        $('records').addEventListener('change', async (e) => {
            if (e.target.dataset.role === 'choice') {
                await api('POST', '/records/edit/select', { value: e.target.value });
                await loadRecords();
            }
        });

        $('records').addEventListener('keydown', async (e) => {
            if (e.target.dataset.role !== 'text') {
                return;
            }
            if (e.key === 'Enter') {
                await api('POST', '/records/edit/input', { value: e.target.value });
                await api('POST', '/records/edit/commit');
                await loadRecords();
            } else if (e.key === 'Escape') {
                await api('POST', '/records/edit/cancel');
                await loadRecords();
            }
        });

        $('records').addEventListener('focusout', async (e) => {
            if (e.target.dataset.role !== 'text' || !e.target.isConnected || switching) {
                return;
            }
            await api('POST', '/records/edit/input', { value: e.target.value });
            await api('POST', '/records/edit/blur');
            await loadRecords();
        });

        $('file-input').addEventListener('change', async (e) => {
            const form = new FormData();
            for (const file of e.target.files) {
                form.append('files', file, file.name);
            }
            e.target.value = '';
            if ([...form.keys()].length > 0) {
                await api('POST', '/files', form);
                refresh();
            }
        });

        $('analyze').onclick = () => api('POST', '/analyze').then(refresh);
        $('reset').onclick = () => api('POST', '/reset').then(renderSession);

        document.querySelectorAll('[data-export]').forEach(button => {
            button.onclick = () => {
                const name = encodeURIComponent($('filename').value);
                window.location = `/export/${button.dataset.export}?filename=${name}`;
            };
        });

        $('copy').onclick = async () => {
            const text = await (await fetch('/export/clipboard')).text();
            await navigator.clipboard.writeText(text);
            toast('Copied to clipboard');
        };

        async function refresh() {
            renderSession(await api('GET', '/session'));
        }

        const events = new EventSource('/events');
        events.addEventListener('NotificationRaised', (e) => toast(JSON.parse(e.data).message));
        for (const name of ['EntryStatusChanged', 'ProgressUpdate', 'AnalysisCompleted', 'FileRemoved', 'SessionReset']) {
            events.addEventListener(name, refresh);
        }

        refresh();
    </script>
</body>
</html>
"#;
