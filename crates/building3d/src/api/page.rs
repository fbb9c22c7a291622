use crate::jobs::bbox::BBoxRules;
use crate::ui::{LngLat, DEFAULT_CENTER, DEFAULT_ZOOM, SATELLITE_STYLE};

/// Values baked into the map page when it is rendered.
#[derive(Debug, Clone)]
pub struct MapPage {
    pub mapbox_token: String,
    pub center: LngLat,
    pub zoom: f64,
    pub max_span: f64,
    /// Mirrors `BBoxRules::reject_inverted`; a click without a drag is refused.
    pub reject_empty: bool,
}

impl MapPage {
    pub fn new(mapbox_token: impl Into<String>, rules: &BBoxRules) -> Self {
        Self {
            mapbox_token: mapbox_token.into(),
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            max_span: rules.max_span,
            reject_empty: rules.reject_inverted,
        }
    }

    pub fn render(&self) -> String {
        MAP_HTML
            .replace("__MAPBOX_TOKEN__", &js_string(&self.mapbox_token))
            .replace("__MAP_STYLE__", &js_string(SATELLITE_STYLE))
            .replace("__CENTER_LNG__", &self.center.lng.to_string())
            .replace("__CENTER_LAT__", &self.center.lat.to_string())
            .replace("__ZOOM__", &self.zoom.to_string())
            .replace("__MAX_SPAN__", &self.max_span.to_string())
            .replace("__REJECT_EMPTY__", &self.reject_empty.to_string())
    }
}

fn js_string(s: &str) -> String {
    // a JSON string literal is a valid JS literal; also keep `</script>` out
    serde_json::Value::String(s.to_string())
        .to_string()
        .replace("</", "<\\/")
}

const MAP_HTML: &str = r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Building 3D Generator</title>
  <link href="https://api.mapbox.com/mapbox-gl-js/v3.3.0/mapbox-gl.css" rel="stylesheet" />
  <script src="https://api.mapbox.com/mapbox-gl-js/v3.3.0/mapbox-gl.js"></script>
  <style>
    :root {
      --panel: #ffffff;
      --border: #d7dbe6;
      --text: #1b1f2a;
      --muted: #5b6275;
      --accent: #3b82f6;
      --go: #22c55e;
    }
    * { box-sizing: border-box; }
    body {
      margin: 0;
      font-family: "Segoe UI", "Helvetica Neue", Arial, sans-serif;
      color: var(--text);
    }
    #map { position: absolute; inset: 0; }
    .panel {
      position: absolute;
      top: 16px;
      background: var(--panel);
      border: 1px solid var(--border);
      border-radius: 10px;
      padding: 14px 16px;
      box-shadow: 0 2px 8px rgba(0,0,0,0.15);
    }
    #controls { left: 16px; width: 280px; }
    #jobs { right: 56px; width: 260px; max-height: 24rem; overflow-y: auto; }
    h1 { margin: 0 0 12px; font-size: 18px; }
    h2 { margin: 0 0 8px; font-size: 16px; }
    button {
      padding: 8px 12px;
      border: 0;
      color: white;
      border-radius: 6px;
      cursor: pointer;
    }
    button:disabled { opacity: 0.5; cursor: default; }
    #select-btn { background: var(--accent); }
    #submit-btn { background: var(--go); margin-top: 8px; }
    #selection { margin-top: 12px; padding: 8px; background: #f3f4f6; border-radius: 6px; font-size: 12px; }
    .muted { color: var(--muted); font-size: 12px; }
    .job { padding: 6px 8px; border: 1px solid var(--border); border-radius: 6px; margin-bottom: 6px; font-size: 13px; }
    .job-marker {
      width: 20px; height: 20px; border-radius: 50%;
      background: var(--accent); border: 2px solid white; cursor: pointer;
    }
  </style>
</head>
<body>
  <div id="map"></div>

  <div id="controls" class="panel">
    <h1>Building 3D Generator</h1>
    <button id="select-btn" onclick="startSelection()">Select area</button>
    <div id="selection" hidden>
      <div>Selected area:</div>
      <div id="selection-coords" class="muted"></div>
      <button id="submit-btn" onclick="submitJob()">Create job</button>
    </div>
  </div>

  <div id="jobs" class="panel">
    <h2>Jobs</h2>
    <div id="job-list"></div>
  </div>

  <script>
    const MAX_SPAN = __MAX_SPAN__;
    const REJECT_EMPTY = __REJECT_EMPTY__;
    mapboxgl.accessToken = __MAPBOX_TOKEN__;

    const map = new mapboxgl.Map({
      container: "map",
      style: __MAP_STYLE__,
      center: [__CENTER_LNG__, __CENTER_LAT__],
      zoom: __ZOOM__
    });
    map.addControl(new mapboxgl.NavigationControl(), "top-right");

    // idle -> selecting -> selected -> submitting -> idle
    const view = {
      state: "idle",
      anchor: null,
      bbox: null,
      jobs: [],
      markers: []
    };

    function emptyShape() {
      return { type: "FeatureCollection", features: [] };
    }

    function rectShape(b) {
      return {
        type: "Feature",
        geometry: {
          type: "Polygon",
          coordinates: [[
            [b.west, b.north], [b.east, b.north], [b.east, b.south],
            [b.west, b.south], [b.west, b.north]
          ]]
        }
      };
    }

    function cornersToBBox(a, b) {
      return {
        north: Math.max(a.lat, b.lat),
        south: Math.min(a.lat, b.lat),
        east: Math.max(a.lng, b.lng),
        west: Math.min(a.lng, b.lng)
      };
    }

    function drawSelection(b) {
      const src = map.getSource("selection");
      if (src) src.setData(b ? rectShape(b) : emptyShape());
    }

    map.on("load", () => {
      map.addSource("selection", { type: "geojson", data: emptyShape() });
      map.addLayer({
        id: "selection-fill", type: "fill", source: "selection",
        paint: { "fill-color": "#3b82f6", "fill-opacity": 0.2 }
      });
      map.addLayer({
        id: "selection-line", type: "line", source: "selection",
        paint: { "line-color": "#3b82f6", "line-width": 2 }
      });
      loadJobs();
    });

    map.on("mousedown", (e) => {
      if (view.state !== "selecting") return;
      view.anchor = e.lngLat;
    });

    map.on("mousemove", (e) => {
      if (view.state !== "selecting" || !view.anchor) return;
      drawSelection(cornersToBBox(view.anchor, e.lngLat));
    });

    map.on("mouseup", (e) => {
      if (view.state !== "selecting" || !view.anchor) return;
      const bbox = cornersToBBox(view.anchor, e.lngLat);
      view.anchor = null;
      map.dragPan.enable();

      if (REJECT_EMPTY && (bbox.north - bbox.south <= 0 || bbox.east - bbox.west <= 0)) {
        drawSelection(null);
        view.bbox = null;
        setState("idle");
        alert("Drag on the map to select an area.");
        return;
      }

      if (bbox.north - bbox.south > MAX_SPAN || bbox.east - bbox.west > MAX_SPAN) {
        drawSelection(null);
        view.bbox = null;
        setState("idle");
        alert("Selection too large. The maximum area is 1km x 1km.");
        return;
      }

      view.bbox = bbox;
      drawSelection(bbox);
      setState("selected");
    });

    function startSelection() {
      if (view.state !== "idle" && view.state !== "selected") return;
      view.bbox = null;
      view.anchor = null;
      drawSelection(null);
      map.dragPan.disable();
      setState("selecting");
    }

    async function submitJob() {
      if (view.state !== "selected" || !view.bbox) return;
      setState("submitting");
      try {
        const res = await fetch("/jobs", {
          method: "POST",
          headers: { "Content-Type": "application/json" },
          body: JSON.stringify({ bbox: view.bbox })
        });
        if (!res.ok) throw new Error("Failed to create job");
        const job = await res.json();
        view.jobs = [job].concat(view.jobs);
        view.bbox = null;
        drawSelection(null);
        setState("idle");
        alert("Job created. Processing will start shortly.");
      } catch (err) {
        console.error("Error creating job:", err);
        setState("selected");
        alert("Failed to create the job.");
      }
    }

    async function loadJobs() {
      try {
        const res = await fetch("/jobs");
        if (!res.ok) throw new Error("HTTP " + res.status);
        view.jobs = await res.json();
        render();
      } catch (err) {
        console.error("Error loading jobs:", err);
      }
    }

    function setState(next) {
      view.state = next;
      render();
    }

    function renderMarkers() {
      view.markers.forEach((m) => m.remove());
      view.markers = view.jobs
        .filter((job) => job.status === "succeeded")
        .map((job) => {
          const b = job.bbox;
          const el = document.createElement("div");
          el.className = "job-marker";
          el.title = "Job " + job.id.slice(0, 8);
          return new mapboxgl.Marker(el)
            .setLngLat([(b.east + b.west) / 2, (b.north + b.south) / 2])
            .addTo(map);
        });
    }

    function renderJobs() {
      const list = document.getElementById("job-list");
      list.replaceChildren();
      view.jobs.forEach((job) => {
        const item = document.createElement("div");
        item.className = "job";
        const id = document.createElement("div");
        id.textContent = "ID: " + job.id.slice(0, 8);
        const status = document.createElement("div");
        status.className = "muted";
        status.textContent = "Status: " + job.status;
        const created = document.createElement("div");
        created.className = "muted";
        created.textContent = new Date(job.created_at).toLocaleString();
        item.append(id, status, created);
        list.append(item);
      });
    }

    function render() {
      const selectBtn = document.getElementById("select-btn");
      selectBtn.disabled = view.state === "selecting" || view.state === "submitting";
      selectBtn.textContent = view.state === "selecting" ? "Selecting area..." : "Select area";

      const panel = document.getElementById("selection");
      const b = view.bbox;
      panel.hidden = !b;
      if (b) {
        document.getElementById("selection-coords").textContent =
          "N: " + b.north.toFixed(6) + ", S: " + b.south.toFixed(6) +
          " / E: " + b.east.toFixed(6) + ", W: " + b.west.toFixed(6);
      }
      const submitBtn = document.getElementById("submit-btn");
      submitBtn.disabled = view.state === "submitting";
      submitBtn.textContent = view.state === "submitting" ? "Creating..." : "Create job";

      renderJobs();
      renderMarkers();
    }
  </script>
</body>
</html>
"##;
