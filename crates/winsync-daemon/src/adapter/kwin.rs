//! KWin environment adapter.
//!
//! KWin has no D-Bus query API for window state, but it can run
//! JavaScript inside the compositor. This adapter loads a generated
//! script through `org.kde.kwin.Scripting`, lets it print one JSON
//! object per line, and reads those lines back from the user journal
//! of the KWin service unit. Actions work the same way minus the
//! read-back.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};
use zbus::Connection;

use winsync_types::{DesktopRecord, MonitorRecord, Rect, WindowRecord};

use super::{AdapterError, EnvironmentAdapter, Result, WorkspaceAction};

/// KWin user service units, in probe order.
const SERVICE_CANDIDATES: [&str; 4] = [
    "plasma-kwin_wayland.service",
    "plasma-kwin_x11.service",
    "kwin_wayland.service",
    "kwin_x11.service",
];

/// One sampling script run feeds all three list queries.
const COLLECT_CACHE_TTL: Duration = Duration::from_millis(250);

/// Journal read retries: the script output can lag the run() call.
const JOURNAL_ATTEMPTS: u32 = 3;
const JOURNAL_RETRY_DELAY: Duration = Duration::from_millis(150);

/// Delay between running a script and stopping it.
const SCRIPT_RUN_DELAY: Duration = Duration::from_millis(50);

static SCRIPT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Sampling script. Prints one `__type: "meta"` object followed by one
/// `__type: "window"` object per managed window. Panel, dock, desktop
/// and plasmashell windows are skipped, matching what a dashboard
/// wants to see.
const SAMPLE_JS: &str = r#"
(function () {
  function rectToObj(r) {
    if (!r) return null;
    return { x: r.x, y: r.y, width: r.width, height: r.height };
  }

  var outputs = workspace.outputs || [];
  var desktops = workspace.desktops || [];
  var current = workspace.currentDesktop || null;
  var activeScreen = workspace.activeScreen || null;

  var outList = [];
  for (var i = 0; i < outputs.length; i++) {
    var o = outputs[i];
    if (!o) continue;
    outList.push({
      name: o.name || ("Screen " + (i + 1)),
      geometry: rectToObj(o.geometry),
      primary: !!(activeScreen && o.name === activeScreen.name)
    });
  }

  var deskList = [];
  for (var i = 0; i < desktops.length; i++) {
    var d = desktops[i];
    deskList.push({ name: d && d.name ? d.name : String(i + 1) });
  }

  print(JSON.stringify({
    __type: "meta",
    outputs: outList,
    desktops: deskList,
    activeDesktopName: current && current.name ? current.name : null
  }));

  var wins = workspace.stackingOrder;
  for (var i = 0; i < wins.length; i++) {
    var w = wins[i];
    if (!w) continue;
    if (w.deleted) continue;
    if (!w.managed) continue;
    if (w.desktopWindow || w.dock || w.specialWindow) continue;
    if (w.resourceClass === "org.kde.plasmashell") continue;

    var names = [];
    if (!w.onAllDesktops) {
      var ds = w.desktops || [];
      for (var j = 0; j < ds.length; j++) {
        var d = ds[j];
        names.push(d && d.name ? d.name : String(d));
      }
    }

    print(JSON.stringify({
      __type: "window",
      id: (w.internalId !== undefined && w.internalId !== null)
        ? String(w.internalId)
        : (w.windowId !== undefined && w.windowId !== null ? String(w.windowId) : null),
      caption: w.caption || null,
      resourceClass: w.resourceClass || null,
      pid: w.pid,
      desktops: names,
      onAllDesktops: !!w.onAllDesktops,
      output: w.output && w.output.name ? w.output.name : null,
      geometry: rectToObj(w.frameGeometry),
      minimized: !!w.minimized,
      maximized: (w.maximizeMode !== undefined && w.maximizeMode !== null)
        ? Number(w.maximizeMode) > 0
        : (w.maximized === true),
      fullscreen: !!w.fullScreen,
      active: w.active === true
    }));
  }
})();
"#;

/// Wrapper for window-targeted action scripts. `__TARGET__` is a JSON
/// string literal, `__BODY__` the per-action statements over `w`.
const ACTION_JS_TEMPLATE: &str = r#"
(function () {
  var targetId = __TARGET__;
  function normId(v) {
    if (v === undefined || v === null) return "";
    return String(v).toLowerCase().replace(/[{}]/g, "");
  }
  var wins = workspace.stackingOrder;
  for (var i = 0; i < wins.length; i++) {
    var w = wins[i];
    if (!w) continue;
    if (w.deleted) continue;
    if (!w.managed) continue;
    if (w.desktopWindow || w.dock || w.specialWindow) continue;
    if (normId(w.internalId) !== normId(targetId) && normId(w.windowId) !== normId(targetId)) continue;
    __BODY__
  }
})();
"#;

const SWITCH_DESKTOP_JS_TEMPLATE: &str = r#"
(function () {
  var dnum = __INDEX__;
  if (workspace.desktops && workspace.desktops.length >= dnum) {
    workspace.currentDesktop = workspace.desktops[dnum - 1];
  } else if (workspace.currentDesktopNumber !== undefined && workspace.currentDesktopNumber !== null) {
    workspace.currentDesktopNumber = dnum;
  }
})();
"#;

#[derive(Debug, Deserialize)]
struct RawGeometry {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl From<RawGeometry> for Rect {
    fn from(g: RawGeometry) -> Self {
        Rect {
            x: g.x,
            y: g.y,
            width: g.width,
            height: g.height,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    name: String,
    geometry: Option<RawGeometry>,
    #[serde(default)]
    primary: bool,
}

#[derive(Debug, Deserialize)]
struct RawDesktop {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawMeta {
    #[serde(default)]
    outputs: Vec<RawOutput>,
    #[serde(default)]
    desktops: Vec<RawDesktop>,
    #[serde(rename = "activeDesktopName")]
    active_desktop_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWindow {
    id: Option<String>,
    caption: Option<String>,
    #[serde(rename = "resourceClass")]
    resource_class: Option<String>,
    pid: Option<i32>,
    #[serde(default)]
    desktops: Vec<String>,
    #[serde(rename = "onAllDesktops", default)]
    on_all_desktops: bool,
    output: Option<String>,
    geometry: Option<RawGeometry>,
    #[serde(default)]
    minimized: bool,
    #[serde(default)]
    maximized: bool,
    #[serde(default)]
    fullscreen: bool,
    #[serde(default)]
    active: bool,
}

/// The `__type` tag dispatches raw journal lines.
#[derive(Debug, Deserialize)]
#[serde(tag = "__type", rename_all = "lowercase")]
enum RawLine {
    Meta(RawMeta),
    Window(RawWindow),
}

#[derive(Debug, Clone, Default)]
struct Collected {
    windows: Vec<WindowRecord>,
    desktops: Vec<DesktopRecord>,
    monitors: Vec<MonitorRecord>,
}

/// Adapter driving KWin's D-Bus scripting interface.
pub struct KwinAdapter {
    dbus: tokio::sync::OnceCell<Connection>,
    service: String,
    cache: Mutex<Option<(Instant, Collected)>>,
}

impl KwinAdapter {
    /// Resolve the KWin service unit. Construction cannot fail: the
    /// session bus is connected lazily on first use, so a missing bus
    /// degrades samples and acks rather than aborting startup.
    ///
    /// `preferred` overrides auto-detection unless it is `"auto"`.
    pub async fn new(preferred: Option<&str>) -> Self {
        let service = match preferred {
            Some(svc) if svc != "auto" => svc.to_string(),
            _ => detect_service().await,
        };
        debug!("using KWin service unit {service}");
        Self {
            dbus: tokio::sync::OnceCell::new(),
            service,
            cache: Mutex::new(None),
        }
    }

    /// Session bus connection, established on first use. A failed
    /// attempt leaves the cell empty so the next call retries.
    async fn bus(&self) -> Result<&Connection> {
        Ok(self.dbus.get_or_try_init(Connection::session).await?)
    }

    /// Run `script` inside KWin and return once it has executed.
    async fn run_script(&self, script: &str, tag: &str) -> Result<()> {
        let seq = SCRIPT_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = format!("winsync_{tag}_{}_{seq}", std::process::id());
        let path = std::env::temp_dir().join(format!("{name}.js"));
        tokio::fs::write(&path, script).await?;

        let result = self.load_run_unload(&path, &name).await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            trace!("failed to remove {}: {e}", path.display());
        }
        result
    }

    async fn load_run_unload(&self, path: &std::path::Path, name: &str) -> Result<()> {
        let path_str = path.to_str().ok_or_else(|| {
            AdapterError::Failed(format!("non-UTF-8 temp path: {}", path.display()))
        })?;
        let bus = self.bus().await?;

        let reply = bus
            .call_method(
                Some("org.kde.KWin"),
                "/Scripting",
                Some("org.kde.kwin.Scripting"),
                "loadScript",
                &(path_str, name),
            )
            .await?;
        let script_id: i32 = reply
            .body()
            .deserialize()
            .map_err(|e| AdapterError::Dbus(e.to_string()))?;

        if script_id < 0 {
            return Err(AdapterError::Failed(format!(
                "KWin refused to load script {name}"
            )));
        }

        let obj_path = format!("/{script_id}");

        bus.call_method(
            Some("org.kde.KWin"),
            obj_path.as_str(),
            Some("org.kde.kwin.Script"),
            "run",
            &(),
        )
        .await?;

        tokio::time::sleep(SCRIPT_RUN_DELAY).await;

        let _ = bus
            .call_method(
                Some("org.kde.KWin"),
                obj_path.as_str(),
                Some("org.kde.kwin.Script"),
                "stop",
                &(),
            )
            .await;
        let _ = bus
            .call_method(
                Some("org.kde.KWin"),
                "/Scripting",
                Some("org.kde.kwin.Scripting"),
                "unloadScript",
                &(name,),
            )
            .await;

        Ok(())
    }

    /// Run the sampling script and parse its journal output.
    async fn collect_fresh(&self) -> Result<Collected> {
        let since = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
        self.run_script(SAMPLE_JS, "sample").await?;

        let mut lines = Vec::new();
        for attempt in 0..JOURNAL_ATTEMPTS {
            lines = read_journal_since(&self.service, &since).await?;
            if lines.iter().any(|l| l.contains("__type")) {
                break;
            }
            trace!("no script output yet (attempt {})", attempt + 1);
            tokio::time::sleep(JOURNAL_RETRY_DELAY).await;
        }

        let collected = parse_journal_lines(&lines);
        if collected.desktops.is_empty() && collected.monitors.is_empty() {
            return Err(AdapterError::NoOutput);
        }
        Ok(collected)
    }

    /// Cached collect: one script run feeds all three list queries of a
    /// sampling tick.
    async fn collect(&self) -> Result<Collected> {
        let mut cache = self.cache.lock().await;
        if let Some((at, collected)) = cache.as_ref()
            && at.elapsed() < COLLECT_CACHE_TTL
        {
            return Ok(collected.clone());
        }
        let fresh = self.collect_fresh().await?;
        *cache = Some((Instant::now(), fresh.clone()));
        Ok(fresh)
    }
}

#[async_trait::async_trait]
impl EnvironmentAdapter for KwinAdapter {
    async fn list_windows(&self, filter_pid: Option<i32>) -> Result<Vec<WindowRecord>> {
        let collected = self.collect().await?;
        Ok(match filter_pid {
            Some(pid) => collected
                .windows
                .into_iter()
                .filter(|w| w.pid == Some(pid))
                .collect(),
            None => collected.windows,
        })
    }

    async fn list_desktops(&self) -> Result<Vec<DesktopRecord>> {
        Ok(self.collect().await?.desktops)
    }

    async fn list_monitors(&self) -> Result<Vec<MonitorRecord>> {
        Ok(self.collect().await?.monitors)
    }

    async fn perform(&self, action: &WorkspaceAction) -> Result<()> {
        let script = action_script(action);
        self.run_script(&script, "action").await
    }
}

/// Probe systemd user units for the active KWin service.
async fn detect_service() -> String {
    for candidate in SERVICE_CANDIDATES {
        let output = Command::new("systemctl")
            .args(["--user", "is-active", candidate])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await;
        if let Ok(output) = output
            && output.status.success()
            && String::from_utf8_lossy(&output.stdout).trim() == "active"
        {
            return candidate.to_string();
        }
    }
    warn!(
        "could not detect an active KWin unit, falling back to {}",
        SERVICE_CANDIDATES[0]
    );
    SERVICE_CANDIDATES[0].to_string()
}

/// Read the KWin unit's journal since `since`, stripping the `js: `
/// prefix KWin puts in front of script print() output.
async fn read_journal_since(service: &str, since: &str) -> Result<Vec<String>> {
    let output = Command::new("journalctl")
        .args([
            "--user",
            "-u",
            service,
            "--since",
            since,
            "-o",
            "cat",
            "--no-pager",
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AdapterError::Failed(format!(
            "journalctl failed for unit {service}: {}",
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| line.strip_prefix("js: ").unwrap_or(line).to_string())
        .collect())
}

fn parse_journal_lines(lines: &[String]) -> Collected {
    let mut meta: Option<RawMeta> = None;
    let mut raw_windows = Vec::new();

    for line in lines {
        let trimmed = line.trim();
        if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
            continue;
        }
        match serde_json::from_str::<RawLine>(trimmed) {
            Ok(RawLine::Meta(m)) => meta = Some(m),
            Ok(RawLine::Window(w)) => raw_windows.push(w),
            Err(_) => {}
        }
    }

    let meta = meta.unwrap_or_else(|| RawMeta {
        outputs: vec![],
        desktops: vec![],
        active_desktop_name: None,
    });

    let desktops = build_desktops(&meta);
    let monitors = build_monitors(meta.outputs);
    let windows = build_windows(raw_windows, &desktops);

    Collected {
        windows,
        desktops,
        monitors,
    }
}

fn build_desktops(meta: &RawMeta) -> Vec<DesktopRecord> {
    let mut desktops: Vec<DesktopRecord> = meta
        .desktops
        .iter()
        .enumerate()
        .map(|(i, d)| DesktopRecord {
            // Indices are 1-based everywhere on the wire
            #[allow(clippy::cast_possible_truncation)] // desktop counts are tiny
            index: (i + 1) as u32,
            name: d.name.clone(),
            current: false,
        })
        .collect();

    // A rename race can leave the reported active name dangling; fall
    // back to the first desktop so a non-empty list always has exactly
    // one current entry.
    let matched = meta
        .active_desktop_name
        .as_deref()
        .and_then(|active| desktops.iter().position(|d| d.name == active));
    if let Some(i) = matched {
        desktops[i].current = true;
    } else if let Some(first) = desktops.first_mut() {
        first.current = true;
    }
    desktops
}

fn build_monitors(mut outputs: Vec<RawOutput>) -> Vec<MonitorRecord> {
    // Stable top-left-first ordering
    outputs.sort_by_key(|o| {
        o.geometry
            .as_ref()
            .map_or((0, 0), |g| (g.y, g.x))
    });
    outputs
        .into_iter()
        .enumerate()
        .map(|(i, o)| MonitorRecord {
            #[allow(clippy::cast_possible_truncation)] // monitor counts are tiny
            index: (i + 1) as u32,
            geometry: o.geometry.map(Rect::from).unwrap_or(Rect {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            }),
            name: o.name,
            primary: o.primary,
        })
        .collect()
}

fn build_windows(raw: Vec<RawWindow>, desktops: &[DesktopRecord]) -> Vec<WindowRecord> {
    raw.into_iter()
        .filter_map(|w| {
            let id = w.id?;
            let indices = if w.on_all_desktops {
                desktops.iter().map(|d| d.index).collect()
            } else {
                w.desktops
                    .iter()
                    .filter_map(|name| desktops.iter().find(|d| &d.name == name))
                    .map(|d| d.index)
                    .collect()
            };
            let title = w
                .resource_class
                .clone()
                .or_else(|| w.caption.clone())
                .unwrap_or_else(|| id.clone());
            Some(WindowRecord {
                id,
                title,
                caption: w.caption,
                pid: w.pid,
                desktops: indices,
                on_all_desktops: w.on_all_desktops,
                monitor: w.output,
                geometry: w.geometry.map(Rect::from),
                minimized: w.minimized,
                maximized: w.maximized,
                fullscreen: w.fullscreen,
                active: w.active,
            })
        })
        .collect()
}

/// Build the JS for one action. Interpolated values go through JSON
/// string encoding, so arbitrary ids cannot escape the literal.
fn action_script(action: &WorkspaceAction) -> String {
    fn js_str(s: &str) -> String {
        serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
    }

    fn windowed(window_id: &str, body: &str) -> String {
        ACTION_JS_TEMPLATE
            .replace("__TARGET__", &js_str(window_id))
            .replace("__BODY__", body)
    }

    match action {
        WorkspaceAction::Activate { window_id } => windowed(
            window_id,
            r"if (w.minimized) w.minimized = false;
    if (!w.onAllDesktops && w.desktops && w.desktops.length && workspace.currentDesktop) {
      workspace.currentDesktop = w.desktops[0];
    }
    workspace.activeWindow = w;
    if (typeof workspace.activateClient === 'function') workspace.activateClient(w);
    if (typeof workspace.raiseWindow === 'function') workspace.raiseWindow(w);",
        ),
        WorkspaceAction::Close { window_id } => windowed(
            window_id,
            r"if (typeof w.closeWindow === 'function') w.closeWindow();",
        ),
        WorkspaceAction::Minimize { window_id } => windowed(window_id, "w.minimized = true;"),
        WorkspaceAction::Maximize { window_id } => windowed(
            window_id,
            r"if (typeof w.setMaximize === 'function') { w.setMaximize(true, true); } else { w.maximizedHoriz = true; w.maximizedVert = true; }",
        ),
        WorkspaceAction::Restore { window_id } => windowed(
            window_id,
            r"w.minimized = false;
    if (typeof w.setMaximize === 'function') { w.setMaximize(false, false); } else { w.maximizedHoriz = false; w.maximizedVert = false; }",
        ),
        WorkspaceAction::Fullscreen { window_id } => windowed(window_id, "w.fullScreen = true;"),
        WorkspaceAction::FullscreenExit { window_id } => {
            windowed(window_id, "w.fullScreen = false;")
        }
        WorkspaceAction::PinToggle { window_id } => {
            windowed(window_id, "w.onAllDesktops = !w.onAllDesktops;")
        }
        WorkspaceAction::SwitchDesktop { index } => {
            SWITCH_DESKTOP_JS_TEMPLATE.replace("__INDEX__", &index.to_string())
        }
        WorkspaceAction::MoveToDesktop { window_id, index } => windowed(
            window_id,
            &format!(
                r"var dnum = {index};
    if (workspace.desktops && workspace.desktops.length >= dnum) {{
      w.desktops = [workspace.desktops[dnum - 1]];
    }}"
            ),
        ),
        WorkspaceAction::MoveToMonitor { window_id, target } => windowed(
            window_id,
            &format!(
                r"var targetMonitor = {};
    var out = null;
    if (workspace.outputs && workspace.outputs.length) {{
      var mnum = parseInt(targetMonitor, 10);
      if (isFinite(mnum) && mnum > 0 && workspace.outputs.length >= mnum) {{
        out = workspace.outputs[mnum - 1];
      }} else {{
        var tname = String(targetMonitor).toLowerCase();
        for (var k = 0; k < workspace.outputs.length; k++) {{
          var o = workspace.outputs[k];
          if (o && o.name && String(o.name).toLowerCase() === tname) {{ out = o; break; }}
        }}
      }}
    }}
    if (out) {{
      if (typeof workspace.sendClientToOutput === 'function') {{ workspace.sendClientToOutput(w, out); }}
      else if (typeof w.setOutput === 'function') {{ w.setOutput(out); }}
    }}",
                js_str(&target.to_string())
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winsync_types::MonitorRef;

    fn meta_line() -> String {
        serde_json::json!({
            "__type": "meta",
            "outputs": [
                {"name": "HDMI-1", "geometry": {"x": 2560, "y": 0, "width": 1920, "height": 1080}, "primary": false},
                {"name": "DP-2", "geometry": {"x": 0, "y": 0, "width": 2560, "height": 1440}, "primary": true}
            ],
            "desktops": [{"name": "Main"}, {"name": "Work"}],
            "activeDesktopName": "Work"
        })
        .to_string()
    }

    fn window_line(id: &str, desktops: &[&str], on_all: bool) -> String {
        serde_json::json!({
            "__type": "window",
            "id": id,
            "caption": "~ : bash",
            "resourceClass": "konsole",
            "pid": 4242,
            "desktops": desktops,
            "onAllDesktops": on_all,
            "output": "DP-2",
            "geometry": {"x": 1, "y": 2, "width": 300, "height": 200},
            "minimized": false,
            "maximized": true,
            "fullscreen": false,
            "active": true
        })
        .to_string()
    }

    #[test]
    fn test_parse_journal_lines() {
        let lines = vec![
            "some unrelated journal noise".to_string(),
            meta_line(),
            window_line("0x1", &["Work"], false),
        ];
        let collected = parse_journal_lines(&lines);

        assert_eq!(collected.desktops.len(), 2);
        assert_eq!(collected.monitors.len(), 2);
        assert_eq!(collected.windows.len(), 1);

        let win = &collected.windows[0];
        assert_eq!(win.id, "0x1");
        assert_eq!(win.title, "konsole");
        assert_eq!(win.desktops, vec![2]);
        assert_eq!(win.monitor.as_deref(), Some("DP-2"));
        assert!(win.maximized);
    }

    #[test]
    fn test_desktops_exactly_one_current() {
        let collected = parse_journal_lines(&[meta_line()]);
        let current: Vec<_> = collected.desktops.iter().filter(|d| d.current).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].name, "Work");
        assert_eq!(current[0].index, 2);
    }

    #[test]
    fn test_dangling_active_desktop_name_falls_back_to_first() {
        let mut meta: serde_json::Value = serde_json::from_str(&meta_line()).unwrap();
        meta["activeDesktopName"] = serde_json::Value::from("Renamed");
        let collected = parse_journal_lines(&[meta.to_string()]);

        let current: Vec<_> = collected.desktops.iter().filter(|d| d.current).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].index, 1);
    }

    #[test]
    fn test_missing_active_desktop_name_falls_back_to_first() {
        let mut meta: serde_json::Value = serde_json::from_str(&meta_line()).unwrap();
        meta["activeDesktopName"] = serde_json::Value::Null;
        let collected = parse_journal_lines(&[meta.to_string()]);

        assert_eq!(
            collected.desktops.iter().filter(|d| d.current).count(),
            1
        );
        assert!(collected.desktops[0].current);
    }

    #[tokio::test]
    async fn test_construction_needs_no_session_bus() {
        // The bus is connected lazily on first use; constructing with
        // an explicit unit must always succeed, even without D-Bus.
        let adapter = KwinAdapter::new(Some("plasma-kwin_wayland.service")).await;
        assert_eq!(adapter.service, "plasma-kwin_wayland.service");
        assert!(adapter.dbus.get().is_none());
    }

    #[test]
    fn test_monitors_sorted_top_left_first() {
        let collected = parse_journal_lines(&[meta_line()]);
        assert_eq!(collected.monitors[0].name, "DP-2");
        assert_eq!(collected.monitors[0].index, 1);
        assert!(collected.monitors[0].primary);
        assert_eq!(collected.monitors[1].name, "HDMI-1");
        assert_eq!(collected.monitors[1].index, 2);
    }

    #[test]
    fn test_pinned_window_gets_all_desktop_indices() {
        let lines = vec![meta_line(), window_line("0x2", &[], true)];
        let collected = parse_journal_lines(&lines);
        assert_eq!(collected.windows[0].desktops, vec![1, 2]);
        assert!(collected.windows[0].on_all_desktops);
    }

    #[test]
    fn test_window_with_stale_desktop_name_is_kept() {
        // A desktop renamed mid-sample: the reference just fails to
        // resolve, the window itself survives.
        let lines = vec![meta_line(), window_line("0x3", &["Gone"], false)];
        let collected = parse_journal_lines(&lines);
        assert_eq!(collected.windows.len(), 1);
        assert!(collected.windows[0].desktops.is_empty());
    }

    #[test]
    fn test_window_without_id_is_dropped() {
        let mut win: serde_json::Value = serde_json::from_str(&window_line("x", &[], false)).unwrap();
        win["id"] = serde_json::Value::Null;
        let lines = vec![meta_line(), win.to_string()];
        let collected = parse_journal_lines(&lines);
        assert!(collected.windows.is_empty());
    }

    #[test]
    fn test_action_script_escapes_window_id() {
        let script = action_script(&WorkspaceAction::Close {
            window_id: "0x1\"; badstuff(); \"".to_string(),
        });
        assert!(script.contains(r#""0x1\"; badstuff(); \"""#));
        assert!(script.contains("closeWindow"));
    }

    #[test]
    fn test_action_script_switch_desktop() {
        let script = action_script(&WorkspaceAction::SwitchDesktop { index: 3 });
        assert!(script.contains("var dnum = 3;"));
        assert!(script.contains("currentDesktop"));
    }

    #[test]
    fn test_action_script_move_to_monitor_by_name() {
        let script = action_script(&WorkspaceAction::MoveToMonitor {
            window_id: "0x1".to_string(),
            target: MonitorRef::Name("DP-2".to_string()),
        });
        assert!(script.contains(r#""DP-2""#));
        assert!(script.contains("sendClientToOutput"));
    }

    #[test]
    fn test_sample_script_is_valid_single_expression() {
        // Guard against accidental template damage: balanced braces.
        let opens = SAMPLE_JS.matches('{').count();
        let closes = SAMPLE_JS.matches('}').count();
        assert_eq!(opens, closes);
    }
}
