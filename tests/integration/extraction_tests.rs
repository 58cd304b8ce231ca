use dealwatch::extraction::Page;
use dealwatch::plugins::adapters::{extract_page, select_adapter, AdapterKind};
use rstest::rstest;

const STRUCTURED_ONLY: &str = r#"<html><head><script type="application/ld+json">
    {"@type":"Product","offers":{"price":"48.00"}}
</script></head><body></body></html>"#;

#[rstest]
#[case("https://www.amazon.com/dp/B0001")]
#[case("https://www.walmart.com/ip/1")]
#[case("https://www.bestbuy.com/site/1.p")]
#[case("https://www.target.com/p/-/A-1")]
#[case("https://www.ebay.com/itm/1")]
#[case("https://www.sephora.com/product/1")]
#[case("https://dedcool.com/products/1")]
#[case("https://www.costco.com/1.product.html")]
#[case("https://boutique.example/item")]
fn test_structured_data_wins_for_every_adapter(#[case] url: &str) {
    let (_, result) = extract_page(url, STRUCTURED_ONLY);
    assert_eq!(result.price_text, "$48.00");
    assert_eq!(result.normalized_price, Some(48.0));
    assert_eq!(result.title, "Unknown Product");
}

#[test]
fn test_structured_data_outranks_site_selectors() {
    let html = r#"<html><head>
        <script type="application/ld+json">{"@type":"Product","name":"Echo Dot","offers":{"price":"29.99"}}</script>
        </head><body>
        <span id="productTitle">Echo Dot (5th Gen)</span>
        <span class="priceToPay"><span class="a-offscreen">$49.99</span></span>
        </body></html>"#;

    let (adapter, result) = extract_page("https://www.amazon.com/dp/B09B8V1LZ3", html);

    assert_eq!(adapter, AdapterKind::Amazon);
    assert_eq!(result.title, "Echo Dot");
    assert_eq!(result.price_text, "$29.99");
}

#[test]
fn test_social_meta_precedes_site_selectors() {
    let html = r#"<html><head>
        <meta property="og:title" content="Meta Title">
        <meta property="product:price:amount" content="12.5">
        </head><body><h1 data-test="product-title">DOM Title</h1><span data-test="product-price">$99.00</span></body></html>"#;

    let (_, result) = extract_page("https://www.target.com/p/x", html);

    assert_eq!(result.title, "Meta Title");
    assert_eq!(result.price_text, "$12.50");
}

#[test]
fn test_generic_ignores_retailer_selectors() {
    let html = r#"<span id="productTitle">Not used</span>
        <span id="priceblock_ourprice">$10.00</span>
        <h2>Navigation menu</h2>
        <h1>Real Title</h1>"#;

    let page = Page::parse("https://shop.example/p", html);
    let generic = AdapterKind::Generic.extract(&page);
    let amazon = AdapterKind::Amazon.extract(&page);

    assert_eq!(generic.title, "Real Title");
    assert_eq!(generic.price_text, "$10.00"); // currency heuristic on visible text
    assert_eq!(amazon.title, "Not used");
}

#[test]
fn test_selection_is_stable() {
    for _ in 0..3 {
        assert_eq!(select_adapter("https://WWW.BESTBUY.COM/site/x"), AdapterKind::BestBuy);
    }
}
