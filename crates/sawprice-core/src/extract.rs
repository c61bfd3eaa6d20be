//! Pure DOM extraction over an HTML snapshot.
//!
//! Each field is read independently; a field that cannot be found is left as
//! `None` without discarding the rest of the item.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::normalize::{clean_text, parse_price};

/// CSS selectors describing one marketplace's result cards.
///
/// Field selectors are fallback chains: the first selector that matches
/// inside the card wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSelectors {
    pub item: &'static str,
    pub title: &'static [&'static str],
    /// When empty the price is searched in the card's full text.
    pub price: &'static [&'static str],
    pub link: &'static [&'static str],
    pub image: &'static [&'static str],
    pub location: &'static [&'static str],
}

/// Field values as found in one card, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    pub price: Option<String>,
    pub href: Option<String>,
    pub image: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector {
        selector: &'static str,
        message: String,
    },
}

struct CompiledSelectors {
    item: Selector,
    title: Vec<Selector>,
    price: Vec<Selector>,
    link: Vec<Selector>,
    image: Vec<Selector>,
    location: Vec<Selector>,
}

impl CompiledSelectors {
    fn compile(selectors: &SiteSelectors) -> Result<Self, ExtractError> {
        Ok(Self {
            item: compile_one(selectors.item)?,
            title: compile_chain(selectors.title)?,
            price: compile_chain(selectors.price)?,
            link: compile_chain(selectors.link)?,
            image: compile_chain(selectors.image)?,
            location: compile_chain(selectors.location)?,
        })
    }
}

/// Maps every result card in `html` to a [`RawItem`], in document order.
pub fn extract_items(html: &str, selectors: &SiteSelectors) -> Result<Vec<RawItem>, ExtractError> {
    let compiled = CompiledSelectors::compile(selectors)?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&compiled.item)
        .map(|card| read_item(card, &compiled))
        .collect())
}

fn read_item(card: ElementRef<'_>, selectors: &CompiledSelectors) -> RawItem {
    let price = if selectors.price.is_empty() {
        parse_price(&card.text().collect::<Vec<_>>().join(" "))
    } else {
        first_text(card, &selectors.price).and_then(|text| parse_price(&text))
    };

    let own_href = (card.value().name() == "a")
        .then(|| card.value().attr("href"))
        .flatten()
        .and_then(clean_text);
    let href = own_href.or_else(|| first_attr(card, &selectors.link, &["href"]));

    RawItem {
        title: first_text(card, &selectors.title),
        price,
        href,
        image: first_attr(card, &selectors.image, &["src", "data-src"]),
        location: first_text(card, &selectors.location),
    }
}

fn first_text(card: ElementRef<'_>, chain: &[Selector]) -> Option<String> {
    chain.iter().find_map(|selector| {
        card.select(selector)
            .find_map(|element| clean_text(&element.text().collect::<Vec<_>>().join(" ")))
    })
}

fn first_attr(card: ElementRef<'_>, chain: &[Selector], attrs: &[&str]) -> Option<String> {
    chain.iter().find_map(|selector| {
        card.select(selector).find_map(|element| {
            attrs
                .iter()
                .find_map(|attr| element.value().attr(attr).and_then(clean_text))
        })
    })
}

fn compile_one(selector: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|error| ExtractError::InvalidSelector {
        selector,
        message: error.to_string(),
    })
}

fn compile_chain(chain: &'static [&'static str]) -> Result<Vec<Selector>, ExtractError> {
    chain.iter().map(|selector| compile_one(*selector)).collect()
}
