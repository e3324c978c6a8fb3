// src/handlers/public.rs
//
// Rotas públicas (atrás do portão). Servem só o snapshot já sanitizado;
// nada aqui consulta o repositório.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Json,
};

use crate::{common::error::AppError, config::AppState};

// GET /public-report.json
#[utoipa::path(
    get,
    path = "/public-report.json",
    tag = "Público",
    params(
        ("t" = Option<String>, Query, description = "Token de acesso (PUBLIC_REPORT_TOKEN)")
    ),
    responses(
        (status = 200, description = "Relatório público (somente agregados)"),
        (status = 404, description = "Token ausente ou inválido"),
        (status = 503, description = "Relatório ainda não gerado")
    )
)]
pub async fn get_public_report(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let snapshot = app_state.snapshot.get().await.ok_or(AppError::SnapshotUnavailable)?;
    let last_modified = snapshot.generated_at.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    Ok((
        StatusCode::OK,
        [
            (header::CACHE_CONTROL, "no-store".to_string()),
            (header::LAST_MODIFIED, last_modified),
            (header::ETAG, format!("\"r{}\"", snapshot.revision)),
        ],
        Json((*snapshot.body).clone()),
    ))
}

// GET /publico/roi
#[utoipa::path(
    get,
    path = "/publico/roi",
    tag = "Público",
    params(
        ("t" = Option<String>, Query, description = "Token de acesso (PUBLIC_REPORT_TOKEN)")
    ),
    responses(
        (status = 200, description = "Página HTML do relatório público", body = String, content_type = "text/html"),
        (status = 404, description = "Token ausente ou inválido")
    )
)]
pub async fn get_public_page() -> impl IntoResponse {
    ([(header::CACHE_CONTROL, "no-store")], Html(PUBLIC_PAGE))
}

// A página repassa o próprio `?t=` para o JSON; sem token válido o JSON também dá 404.
const PUBLIC_PAGE: &str = r#"<!doctype html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="robots" content="noindex, nofollow">
<title>Relatório de ROI</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 0; background: #f5f6f8; color: #1f2933; }
  main { max-width: 960px; margin: 0 auto; padding: 24px; }
  h1 { margin: 0 0 4px; font-size: 1.6rem; }
  .muted { color: #6b7280; font-size: .9rem; }
  .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 12px; margin: 16px 0; }
  .card { background: #fff; border-radius: 10px; padding: 14px 16px; box-shadow: 0 1px 2px rgba(0,0,0,.06); }
  .card small { color: #6b7280; display: block; }
  .card strong { font-size: 1.35rem; }
  table { width: 100%; border-collapse: collapse; background: #fff; border-radius: 10px; overflow: hidden; }
  th, td { text-align: left; padding: 8px 12px; border-bottom: 1px solid #eef0f3; font-size: .92rem; }
  ul { padding-left: 18px; }
  .off { color: #9ca3af; font-style: italic; }
</style>
</head>
<body>
<main>
  <h1 id="title">Relatório de ROI</h1>
  <div class="muted" id="period"></div>
  <section id="overview" class="grid"></section>
  <section><h2>Alertas e destaques</h2><ul id="notes"></ul></section>
  <section><h2>Recomendações</h2><div id="recommendations"></div></section>
  <section><h2>Atribuição indireta</h2><div id="attribution"></div></section>
  <section><h2>Origens</h2><div id="sources"></div></section>
  <section><h2>Principais motivos de perda</h2><div id="losses"></div></section>
  <section><h2>Vendedores</h2><div id="sellers"></div></section>
</main>
<script>
(function () {
  var off = '<p class="off">dados indisponíveis</p>';
  function el(id) { return document.getElementById(id); }
  function esc(v) { return String(v == null ? '---' : v).replace(/[&<>"]/g, function (c) { return '&#' + c.charCodeAt(0) + ';'; }); }
  function fig(f) { return f && f.display ? esc(f.display) : '---'; }
  function ready(w) { return w && w.status === 'ready' ? w.data : null; }
  function card(label, f) { return '<div class="card"><small>' + esc(label) + '</small><strong>' + fig(f) + '</strong></div>'; }
  function table(head, rows) {
    return '<table><tr>' + head.map(function (h) { return '<th>' + esc(h) + '</th>'; }).join('') + '</tr>' +
      rows.map(function (r) { return '<tr>' + r.map(function (c) { return '<td>' + c + '</td>'; }).join('') + '</tr>'; }).join('') +
      '</table>';
  }

  fetch('/public-report.json' + window.location.search, { cache: 'no-store' })
    .then(function (r) { if (!r.ok) { throw new Error(r.status); } return r.json(); })
    .then(function (report) {
      if (report.brand) { el('title').textContent = 'Relatório de ROI · ' + report.brand; }
      el('period').textContent = 'Período: ' + (report.periodLabel || '---');

      var roi = report.roi || {};
      var ov = ready(roi.overview);
      el('overview').innerHTML = ov ? [
        card('Investimento', ov.investment), card('Vendas de mídia paga', ov.sales),
        card('Faturamento', ov.revenue), card('Custo por venda', ov.costPerSale),
        card('ROI (faturamento)', ov.roiPercentage), card('Vazamento de leads', ov.leakagePercentage)
      ].concat((ov.marginScenarios || []).map(function (m) {
        return card('ROI com margem de ' + fig(m.marginPercent), m.roiPercentage);
      })).join('') : off;

      var notes = (roi.alerts || []).concat(roi.insights || []);
      el('notes').innerHTML = notes.length ? notes.map(function (n) { return '<li>' + esc(n) + '</li>'; }).join('') : '<li class="off">nenhum</li>';

      var recs = roi.recommendations || [];
      el('recommendations').innerHTML = recs.length ? table(['Ação', 'Resultado esperado', 'Prioridade'], recs.map(function (r) {
        return [esc(r.action), esc(r.expectedResult), esc(r.priority)];
      })) : '<p class="off">nenhuma</p>';

      var at = ready(roi.attribution);
      el('attribution').innerHTML = at ? '<p class="muted">' + esc(at.note) + '</p>' + (at.comparison ? table(
        ['', 'Direto', 'Com atribuição'],
        [['Vendas', fig(at.comparison.direct.sales), fig(at.comparison.withAttribution.sales)],
         ['Custo por venda', fig(at.comparison.direct.costPerSale), fig(at.comparison.withAttribution.costPerSale)],
         ['ROI', fig(at.comparison.direct.roiPercentage), fig(at.comparison.withAttribution.roiPercentage)]]) : '') : off;

      var q = report.quality || {};
      var src = ready(q.sources);
      el('sources').innerHTML = src ? table(['Origem', 'Leads', 'Vendas', 'Conversão'], src.map(function (s) {
        return [esc(s.origin), fig(s.leads), fig(s.wins), fig(s.conversionRate)];
      })) : off;

      var ls = ready(q.lossReasons);
      el('losses').innerHTML = ls ? table(['Motivo', 'Qtd.', '% das perdas'], (ls.reasons || []).map(function (l) {
        return [esc(l.reason), esc(l.count), esc(l.percentageOfLosses) + '%'];
      })) : off;

      var sp = ready(q.salespeople);
      el('sellers').innerHTML = sp ? table(['Vendedor', 'Leads', 'Vendas', 'Conversão'], sp.map(function (s) {
        return [esc(s.name), fig(s.leads), fig(s.wins), fig(s.conversionRate)];
      })) : off;
    })
    .catch(function () { el('overview').innerHTML = '<p class="off">Relatório indisponível no momento.</p>'; });
})();
</script>
</body>
</html>
"#;
