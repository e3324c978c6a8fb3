// src/services/sanitizer.rs
//
// Projeção do relatório completo para o relatório público. Funciona por lista
// de permissão: só sai o que está declarado em PUBLIC_REPORT_FIELDS.
// Qualquer chave nova no relatório completo fica de fora até alguém
// declará-la aqui.

use serde_json::{Map, Value};

/// Nó da árvore de campos permitidos.
#[derive(Debug)]
pub enum Field {
    /// String, número ou booleano. Objeto ou lista no lugar é descartado.
    Scalar,
    Object(&'static [(&'static str, Field)]),
    List(&'static Field),
    /// Lista cortada nos `n` primeiros itens.
    Top(usize, &'static Field),
    /// `Widget<T>`: status + mensagem ou dados.
    Widget(&'static Field),
    /// Texto trocado por `"{prefixo} {posição}"` (posição na lista mais próxima, a partir de 1).
    Anonymized(&'static str),
}

const FIGURE: Field = Field::Object(&[("value", Field::Scalar), ("display", Field::Scalar)]);

const SCALAR_LIST: Field = Field::List(&Field::Scalar);

const MARGIN_SCENARIO: Field = Field::Object(&[("marginPercent", FIGURE), ("roiPercentage", FIGURE)]);

const CHANNEL: Field = Field::Object(&[
    ("channel", Field::Scalar),
    ("investment", FIGURE),
    ("leadsReportedByAgency", FIGURE),
    ("leadsInCrm", FIGURE),
    ("sales", FIGURE),
    ("revenue", FIGURE),
    ("costPerLead", FIGURE),
    ("costPerSale", FIGURE),
    ("roiPercentage", FIGURE),
    ("conversionRate", FIGURE),
    ("leakagePercentage", FIGURE),
    ("investmentShare", FIGURE),
    ("crmExceedsAgency", Field::Scalar),
]);

const OVERVIEW: Field = Field::Object(&[
    ("investment", FIGURE),
    ("leadsReportedByAgency", FIGURE),
    ("leadsInCrm", FIGURE),
    ("sales", FIGURE),
    ("revenue", FIGURE),
    ("costPerLeadAgency", FIGURE),
    ("costPerLeadReal", FIGURE),
    ("costPerSale", FIGURE),
    ("roiPercentage", FIGURE),
    ("averageTicket", FIGURE),
    ("leakagePercentage", FIGURE),
    ("marginScenarios", Field::List(&MARGIN_SCENARIO)),
    ("channels", Field::List(&CHANNEL)),
]);

const ATTRIBUTED_BUCKET: Field = Field::Object(&[
    ("bucket", Field::Scalar),
    ("fractionPercent", Field::Scalar),
    ("totalSales", Field::Scalar),
    ("attributedSales", Field::Scalar),
    ("attributedRevenue", Field::Scalar),
]);

const SCENARIO: Field = Field::Object(&[
    ("sales", FIGURE),
    ("revenue", FIGURE),
    ("costPerSale", FIGURE),
    ("roiPercentage", FIGURE),
]);

const ATTRIBUTION: Field = Field::Object(&[
    (
        "breakdown",
        Field::Object(&[
            ("buckets", Field::List(&ATTRIBUTED_BUCKET)),
            ("totalAttributedSales", Field::Scalar),
            ("totalAttributedRevenue", Field::Scalar),
        ]),
    ),
    (
        "comparison",
        Field::Object(&[
            ("direct", SCENARIO),
            ("withAttribution", SCENARIO),
            ("costPerSaleChange", FIGURE),
            ("roiChange", FIGURE),
        ]),
    ),
    ("note", Field::Scalar),
]);

const RECOMMENDATION: Field = Field::Object(&[
    ("action", Field::Scalar),
    ("expectedResult", Field::Scalar),
    ("priority", Field::Scalar),
]);

// Vendas individuais (`sales`) nunca entram: têm nome e telefone de cliente.
const ROI: Field = Field::Object(&[
    ("period", Field::Scalar),
    ("periodLabel", Field::Scalar),
    ("overview", Field::Widget(&OVERVIEW)),
    ("attribution", Field::Widget(&ATTRIBUTION)),
    ("alerts", SCALAR_LIST),
    ("insights", SCALAR_LIST),
    ("recommendations", Field::List(&RECOMMENDATION)),
]);

const SOURCE: Field = Field::Object(&[
    ("origin", Field::Scalar),
    ("leads", FIGURE),
    ("wins", FIGURE),
    ("losses", FIGURE),
    ("revenue", FIGURE),
    ("conversionRate", FIGURE),
    ("quality", Field::Scalar),
]);

const PAID_MEDIA: Field = Field::Object(&[
    ("leads", FIGURE),
    ("wins", FIGURE),
    ("losses", FIGURE),
    ("conversionRate", FIGURE),
    ("costPerLead", FIGURE),
    ("costPerSale", FIGURE),
    ("referralMultiplier", FIGURE),
]);

const LOSS_REASON: Field = Field::Object(&[
    ("reason", Field::Scalar),
    ("count", Field::Scalar),
    ("percentageOfLosses", Field::Scalar),
]);

const LOSSES: Field = Field::Object(&[
    ("reasons", Field::Top(2, &LOSS_REASON)),
    ("totalLosses", FIGURE),
    ("coldLeadsPercentage", FIGURE),
]);

const SALESPERSON: Field = Field::Object(&[
    ("name", Field::Anonymized("Vendedor")),
    ("leads", FIGURE),
    ("wins", FIGURE),
    ("losses", FIGURE),
    ("revenue", FIGURE),
    ("averageDealValue", FIGURE),
    ("conversionRate", FIGURE),
]);

const QUALITY: Field = Field::Object(&[
    ("period", Field::Scalar),
    ("periodLabel", Field::Scalar),
    ("sources", Field::Widget(&Field::List(&SOURCE))),
    ("paidMedia", Field::Widget(&PAID_MEDIA)),
    ("lossReasons", Field::Widget(&LOSSES)),
    ("salespeople", Field::Widget(&Field::List(&SALESPERSON))),
]);

/// Tudo o que pode aparecer no relatório público.
pub static PUBLIC_REPORT_FIELDS: Field = Field::Object(&[
    ("generatedAt", Field::Scalar),
    ("brand", Field::Scalar),
    ("period", Field::Scalar),
    ("periodLabel", Field::Scalar),
    ("roi", ROI),
    ("quality", QUALITY),
]);

/// Aplica `PUBLIC_REPORT_FIELDS` ao relatório completo serializado.
pub fn sanitize(report: &Value) -> Value {
    match project(report, &PUBLIC_REPORT_FIELDS, "$", None) {
        Some(Value::Object(map)) => Value::Object(map),
        _ => Value::Object(Map::new()),
    }
}

// `None` = descartar o valor. Formato inesperado é sempre descartado.
fn project(value: &Value, field: &Field, path: &str, position: Option<usize>) -> Option<Value> {
    if value.is_null() {
        return Some(Value::Null);
    }

    match field {
        Field::Scalar => match value {
            Value::Object(_) | Value::Array(_) => {
                tracing::debug!("Campo '{}' deveria ser escalar; descartado", path);
                None
            }
            scalar => Some(scalar.clone()),
        },

        Field::Object(allowed) => {
            let Value::Object(map) = value else {
                tracing::debug!("Campo '{}' deveria ser objeto; descartado", path);
                return None;
            };

            let mut out = Map::new();
            for (key, child) in map {
                let Some((_, child_field)) = allowed.iter().find(|(name, _)| *name == key.as_str()) else {
                    tracing::debug!("Chave fora da lista de permissão: {}.{}", path, key);
                    continue;
                };
                let child_path = format!("{path}.{key}");
                if let Some(projected) = project(child, child_field, &child_path, position) {
                    out.insert(key.clone(), projected);
                }
            }
            Some(Value::Object(out))
        }

        Field::List(item) => project_list(value, item, path, usize::MAX),

        Field::Top(limit, item) => project_list(value, item, path, *limit),

        Field::Widget(data) => {
            let Value::Object(map) = value else {
                tracing::debug!("Widget '{}' deveria ser objeto; descartado", path);
                return None;
            };

            let mut out = Map::new();
            for (key, child) in map {
                let child_path = format!("{path}.{key}");
                let projected = match key.as_str() {
                    "status" | "message" => project(child, &Field::Scalar, &child_path, position),
                    "data" => project(child, data, &child_path, position),
                    _ => {
                        tracing::debug!("Chave fora da lista de permissão: {}", child_path);
                        None
                    }
                };
                if let Some(projected) = projected {
                    out.insert(key.clone(), projected);
                }
            }
            Some(Value::Object(out))
        }

        Field::Anonymized(prefix) => match (value, position) {
            (Value::String(_), Some(index)) => Some(Value::String(format!("{} {}", prefix, index + 1))),
            _ => {
                tracing::debug!("Campo anonimizado '{}' fora de lista ou não textual; descartado", path);
                None
            }
        },
    }
}

fn project_list(value: &Value, item: &Field, path: &str, limit: usize) -> Option<Value> {
    let Value::Array(items) = value else {
        tracing::debug!("Campo '{}' deveria ser lista; descartado", path);
        return None;
    };

    let projected = items
        .iter()
        .take(limit)
        .enumerate()
        .filter_map(|(index, entry)| project(entry, item, &format!("{path}[{index}]"), Some(index)))
        .collect();
    Some(Value::Array(projected))
}
