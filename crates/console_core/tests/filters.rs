use console_core::{decode, encode, Direction, FilterPatch, FilterState, SortOrder, ALL};
use pretty_assertions::assert_eq;

fn params(query: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    pairs.sort();
    pairs
}

#[test]
fn default_state_encodes_to_empty_query() {
    assert_eq!(encode(&FilterState::default()), "");
}

#[test]
fn type_then_search_yields_exactly_two_params() {
    let state = FilterState::default()
        .apply(&FilterPatch::default().document_type("boleta"))
        .apply(&FilterPatch::default().search("F001"));

    assert_eq!(
        params(&encode(&state)),
        vec![
            ("search".to_string(), "F001".to_string()),
            ("tipo".to_string(), "boleta".to_string()),
        ]
    );
}

#[test]
fn wire_names_are_stable() {
    let state = FilterState::default().apply(
        &FilterPatch::default()
            .company("c-42")
            .period_from("2024-01")
            .period_to("2024-03")
            .direction("recibidas")
            .sort("total", SortOrder::Asc)
            .page_size(20)
            .page(4),
    );

    assert_eq!(
        params(&encode(&state)),
        vec![
            ("desde".to_string(), "2024-01".to_string()),
            ("direccion".to_string(), "recibidas".to_string()),
            ("empresa".to_string(), "c-42".to_string()),
            ("hasta".to_string(), "2024-03".to_string()),
            ("limit".to_string(), "20".to_string()),
            ("order".to_string(), "asc".to_string()),
            ("page".to_string(), "4".to_string()),
            ("sort".to_string(), "total".to_string()),
        ]
    );
}

#[test]
fn decode_is_left_inverse_of_encode() {
    let start = FilterState::default();
    let patches = [
        FilterPatch::default(),
        FilterPatch::default().search("F001-00023"),
        FilterPatch::default().search("  spaces & ampersands=?  "),
        FilterPatch::default().company("uuid-1").document_type("nota_credito"),
        FilterPatch::default().direction("emitidas").page(7),
        FilterPatch::default().sort("fecha", SortOrder::Asc),
        FilterPatch::default().sort("", SortOrder::Desc),
        FilterPatch::default().company(ALL).document_type(ALL).direction(ALL),
        FilterPatch::default().period_from("2023-12").page_size(200).page(2),
        FilterPatch::default().search("ñandú").period_to("2024-02"),
        FilterPatch::default().page(0).page_size(0),
    ];

    let mut state = start;
    for patch in &patches {
        state = state.apply(patch);
        assert_eq!(decode(&encode(&state)), state, "after {patch:?}");
    }

    // Everything decode produces also round-trips.
    for raw in ["page=x&limit=10", "empresa=&tipo=__all__&search=a+b", "?order=asc&sort="] {
        let decoded = decode(raw);
        assert_eq!(decode(&encode(&decoded)), decoded, "for {raw}");
    }
}

#[test]
fn any_patch_without_page_resets_to_first_page() {
    let deep = FilterState::default().apply(&FilterPatch::default().page(5));
    assert_eq!(deep.page, 5);

    let patches = [
        FilterPatch::default().search("x"),
        FilterPatch::default().company("c1"),
        FilterPatch::default().period_from("2024-05"),
        FilterPatch::default().document_type("factura"),
        FilterPatch::default().direction("emitidas"),
        FilterPatch::default().sort("total", SortOrder::Asc),
        FilterPatch::default().page_size(25),
        FilterPatch::default(),
    ];
    for patch in &patches {
        assert_eq!(deep.apply(patch).page, 1, "{patch:?}");
    }
    assert_eq!(deep.apply(&FilterPatch::default().page(6)).page, 6);
}

#[test]
fn sentinels_and_empty_values_clear_fields() {
    let state = FilterState::default().apply(
        &FilterPatch::default()
            .company("c1")
            .document_type("guia")
            .direction("emitidas")
            .period_from("2024-01"),
    );
    assert_eq!(state.direction, Some(Direction::Issued));
    assert_eq!(state.active_filter_count(), 4);

    let cleared = state.apply(
        &FilterPatch::default()
            .company(ALL)
            .document_type(ALL)
            .direction(ALL)
            .period_from(""),
    );
    assert_eq!(cleared, FilterState::default());
    assert_eq!(encode(&cleared), "");
}

#[test]
fn malformed_query_never_fails() {
    let state = decode("%%%&page=-1&limit=abc&order=ASC&=&direccion=both");
    assert_eq!(state.page, 1);
    assert_eq!(state.page_size, 50);
    assert_eq!(state.sort_order, SortOrder::Desc);
    assert_eq!(state.direction, None);
}
