//! Embedded map page served at `GET /`.
//!
//! The page is kept as a `&'static str` template so it ships inside the
//! binary. [`render_map_page`] fills in the `WebSocket` path, the point of
//! interest and the fallback set once at startup.
//!
//! The script implements the browser side of the live overlay: the heat
//! layer starts on the fallback set, is replaced wholesale by every feed
//! message, and drops back to the fallback set on error or close before a
//! single reconnect is scheduled five seconds later. An error followed by
//! its close counts as one terminal transition.

use heatfeed_types::background_points;

use crate::config::HeatfeedConfig;

const MAP_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Heatfeed | Live crowd map</title>
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.css" crossorigin="anonymous" />
  <script src="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.js" crossorigin="anonymous"></script>
  <script src="https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js"></script>
  <style>
    html, body { margin: 0; height: 100%; font-family: system-ui, sans-serif; }
    #map { position: absolute; inset: 0; }
    #panel {
      position: absolute; top: 12px; right: 12px; z-index: 1000;
      background: rgba(255, 255, 255, 0.92); border-radius: 6px;
      padding: 10px 14px; min-width: 220px; box-shadow: 0 1px 4px rgba(0, 0, 0, 0.3);
    }
    #panel h1 { font-size: 15px; margin: 0 0 6px; }
    #panel dl { display: grid; grid-template-columns: auto 1fr; gap: 2px 8px; margin: 0 0 8px; font-size: 13px; }
    #panel dt { color: #555; }
    #panel dd { margin: 0; font-variant-numeric: tabular-nums; }
    #panel label { display: block; font-size: 13px; margin-top: 4px; }
    .state-open { color: #1a7f37; }
    .state-connecting { color: #9a6700; }
    .state-closed { color: #cf222e; }
  </style>
</head>
<body>
  <div id="map"></div>
  <div id="panel">
    <h1>__POI_TITLE__</h1>
    <dl>
      <dt>Feed</dt><dd id="feed-state" class="state-closed">closed</dd>
      <dt>Intensity</dt><dd id="intensity">-</dd>
      <dt>Crowd</dt><dd id="crowd">-</dd>
      <dt>Updated</dt><dd id="updated">-</dd>
    </dl>
    <label>Override intensity
      <input id="intensity-input" type="range" min="0" max="1" step="0.05" value="__INITIAL_INTENSITY__" />
    </label>
    <label><input id="gathering-input" type="checkbox"__GATHERING_CHECKED__ /> Gathering active</label>
  </div>
  <script>
  (function () {
    "use strict";

    const FEED_PATH = __WS_PATH__;
    const REGION = __REGION__;
    const POI = { name: __POI_NAME__, label: __POI_LABEL__, lat: __POI_LAT__, lng: __POI_LNG__ };
    const FALLBACK = __FALLBACK__;
    const RECONNECT_DELAY_MS = 5000;

    // Single override point, read once: ?feed=ws://host:port/path
    const FEED_URL = new URLSearchParams(window.location.search).get("feed")
      || (window.location.protocol === "https:" ? "wss://" : "ws://") + window.location.host + FEED_PATH;

    const container = document.getElementById("map");
    if (!container) {
      console.error("[heatfeed] map container missing, not initializing");
      return;
    }
    if (!window.L || typeof L.map !== "function" || typeof L.heatLayer !== "function") {
      console.error("[heatfeed] map library unavailable, not initializing");
      return;
    }

    const map = L.map(container).setView([POI.lat, POI.lng], 7);
    L.tileLayer("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png", {
      maxZoom: 18,
      attribution: "&copy; OpenStreetMap contributors",
    }).addTo(map);
    const marker = L.marker([POI.lat, POI.lng]).addTo(map).bindPopup(POI.label);

    const overlay = L.heatLayer(FALLBACK, { radius: 25, blur: 15, maxZoom: 12 }).addTo(map);

    map.on("zoomend", function () {
      overlay.setOptions({ radius: map.getZoom() >= 12 ? 35 : 25 });
    });
    map.on("click", function (event) {
      console.debug("[heatfeed] clicked", event.latlng);
    });

    const sync = { state: "closed", socket: null, reconnect: true, timer: null };

    function setState(state) {
      sync.state = state;
      const el = document.getElementById("feed-state");
      el.textContent = state;
      el.className = "state-" + state;
    }

    function replaceOverlay(points) {
      overlay.setLatLngs(points);
    }

    function isPointList(value) {
      return Array.isArray(value) && value.every(function (p) {
        return Array.isArray(p) && p.length === 3 && p.every(function (n) { return typeof n === "number"; });
      });
    }

    // full_update, heatmap_update, bare array, nested data, in that order.
    function extractPoints(payload) {
      if (payload && payload.type === "full_update" && isPointList(payload.data)) return payload.data;
      if (payload && payload.type === "heatmap_update" && isPointList(payload.data)) return payload.data;
      if (isPointList(payload)) return payload;
      if (payload && isPointList(payload.data)) return payload.data;
      if (payload && payload.data && isPointList(payload.data.points)) return payload.data.points;
      if (payload && (payload.kind === "full" || payload.kind === "incremental") && isPointList(payload.points)) return payload.points;
      return null;
    }

    function showStats(payload) {
      if (!payload || payload.type !== "heatmap_update") return;
      document.getElementById("intensity").textContent = payload.somnathIntensity;
      document.getElementById("crowd").textContent = payload.crowdCount;
      document.getElementById("updated").textContent = new Date(payload.timestamp).toLocaleTimeString();
      marker.setPopupContent(POI.label + "<br>Intensity " + Number(payload.somnathIntensity).toFixed(2) + "<br>~" + Number(payload.crowdCount) + " people");
    }

    function terminate(socket, cause) {
      if (socket !== sync.socket || sync.state === "closed") return;
      console.warn("[heatfeed] feed " + cause + ", showing fallback data");
      setState("closed");
      replaceOverlay(FALLBACK);
      if (!sync.reconnect) return;
      sync.timer = window.setTimeout(function () {
        sync.timer = null;
        if (sync.reconnect) connect();
      }, RECONNECT_DELAY_MS);
    }

    function send(message) {
      if (sync.socket && sync.socket.readyState === WebSocket.OPEN) {
        sync.socket.send(JSON.stringify(message));
      }
    }

    function connect() {
      if (typeof window.WebSocket !== "function") {
        console.error("[heatfeed] WebSocket unavailable, staying on fallback data");
        return;
      }
      setState("connecting");
      const socket = new WebSocket(FEED_URL);
      sync.socket = socket;

      socket.onopen = function () {
        setState("open");
        socket.send(JSON.stringify({ type: "request_data", region: REGION }));
      };
      socket.onmessage = function (event) {
        let payload;
        try {
          payload = JSON.parse(event.data);
        } catch (err) {
          console.warn("[heatfeed] dropping unparseable message", err);
          return;
        }
        const points = extractPoints(payload);
        if (!points) {
          console.warn("[heatfeed] dropping unrecognized message", payload);
          return;
        }
        replaceOverlay(points);
        showStats(payload);
      };
      socket.onerror = function () { terminate(socket, "error"); };
      socket.onclose = function () { terminate(socket, "closed"); };
    }

    document.getElementById("intensity-input").addEventListener("change", function (event) {
      send({ type: "set_crowd_intensity", intensity: Number(event.target.value) });
    });
    document.getElementById("gathering-input").addEventListener("change", function (event) {
      send({ type: "toggle_gathering", active: event.target.checked });
    });

    window.addEventListener("beforeunload", function () {
      sync.reconnect = false;
      if (sync.timer) window.clearTimeout(sync.timer);
      if (sync.socket) sync.socket.close();
    });

    connect();
  })();
  </script>
</body>
</html>
"##;

/// Encode a value as a JavaScript literal safe to embed in a `<script>`.
fn js_literal<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Escape text for an HTML element body.
fn html_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `checked` attribute for the gathering toggle.
const fn checked_attr(on: bool) -> &'static str {
    if on { " checked" } else { "" }
}

/// Render the map page for the given configuration.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if a value cannot be encoded.
pub fn render_map_page(config: &HeatfeedConfig) -> Result<String, serde_json::Error> {
    let poi = &config.point_of_interest;
    Ok(MAP_PAGE
        .replace("__POI_TITLE__", &html_text(&poi.name))
        .replace("__WS_PATH__", &js_literal(&config.server.ws_path)?)
        .replace("__REGION__", &js_literal(&config.feed.region)?)
        .replace("__INITIAL_INTENSITY__", &js_literal(&config.feed.initial_intensity)?)
        .replace("__GATHERING_CHECKED__", checked_attr(config.feed.gathering_active))
        .replace("__POI_NAME__", &js_literal(&poi.name)?)
        .replace("__POI_LABEL__", &js_literal(&html_text(&poi.name))?)
        .replace("__POI_LAT__", &js_literal(&poi.lat)?)
        .replace("__POI_LNG__", &js_literal(&poi.lng)?)
        .replace("__FALLBACK__", &js_literal(&background_points())?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_filled() {
        let page = render_map_page(&HeatfeedConfig::default()).unwrap();
        assert!(!page.contains("__"));
        assert!(page.contains(r#"const FEED_PATH = "/heatmap-updates";"#));
        assert!(page.contains("[20.888,70.4012,0.9]"));
    }

    #[test]
    fn names_are_escaped() {
        let mut config = HeatfeedConfig::default();
        config.point_of_interest.name = "</script><b>".to_owned();
        let page = render_map_page(&config).unwrap();
        assert!(page.contains("<h1>&lt;/script&gt;&lt;b&gt;</h1>"));
        assert!(page.contains(r#"label: "&lt;/script&gt;&lt;b&gt;""#));
        assert!(page.contains(r#""<\/script><b>""#));
        assert!(page.contains(".bindPopup(POI.label)"));
    }

    #[test]
    fn controls_follow_feed_config() {
        let page = render_map_page(&HeatfeedConfig::default()).unwrap();
        assert!(page.contains(r#"type="checkbox" checked />"#));
        assert!(page.contains(r#"step="0.05" value="0.5" />"#));

        let mut config = HeatfeedConfig::default();
        config.feed.gathering_active = false;
        config.feed.initial_intensity = 0.25;
        let page = render_map_page(&config).unwrap();
        assert!(page.contains(r#"<input id="gathering-input" type="checkbox" />"#));
        assert!(!page.contains("checked />"));
        assert!(page.contains(r#"step="0.05" value="0.25" />"#));
    }
}
