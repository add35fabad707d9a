/// Standalone Leaflet page. Each `{{name}}` placeholder is replaced by a JSON literal.
pub(super) const MAP_HTML: &str = r#"<!doctype html>
<html lang="en">

<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>cartoconv map</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" crossorigin="" />
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js" crossorigin=""></script>
  <style>
    html, body { height: 100%; margin: 0; }
    #map { position: absolute; inset: 0; }
  </style>
</head>

<body>
  <div id="map"></div>
  <script>
    const center = {{center}};
    const bounds = {{bounds}};
    const overlays = {{overlays}};

    const map = L.map('map', { zoomControl: true }).setView(center, {{zoom}});
    L.control.scale().addTo(map);
    L.tileLayer({{tile_url}}, {
      maxZoom: 19,
      attribution: {{attribution}}
    }).addTo(map);

    L.geoJSON(overlays, {
      onEachFeature: (feature, layer) => {
        const props = feature.properties || {};
        const rows = Object.keys(props).map((key) => `<b>${key}</b>: ${props[key]}`);
        if (rows.length) layer.bindPopup(rows.join('<br>'));
      }
    }).addTo(map);

    // A single point has no extent to fit
    if (bounds[0][0] !== bounds[1][0] || bounds[0][1] !== bounds[1][1]) {
      map.fitBounds(bounds, { padding: [20, 20] });
    }
  </script>
</body>

</html>
"#;
