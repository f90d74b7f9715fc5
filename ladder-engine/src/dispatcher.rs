use crate::collector::OrderCollector;
use crate::ladder::{AmountCoin, LadderConfig, MidOrigin, TradeParams};
use crate::notify::NotifyLevel;
use crate::order::{LadderState, Order, Purpose};
use crate::rates::RatesOracle;
use crate::state::{EngineState, PendingConfirmation};
use crate::store::{InMemoryOrderStore, OrderFilter, PricePredicate};
use chrono::Utc;
use ladder_execution::adapter::ExchangeAdapter;
use ladder_execution::models::PlaceOrderAck;
use ladder_instrument::precision::{round_amount, round_price, validate_amount};
use ladder_instrument::{Asset, OrderType, Pair, Side};
use rand::Rng;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// A fixed, non-recursive mapping from short verbs to canonical command text. Expansion replaces only the leading verb token.
const ALIASES: &[(&str, &str)] = &[
    ("b", "balances"),
    ("o", "orders"),
    ("p", "params"),
    ("h", "help"),
    ("v", "version"),
];

/// Outcome of dispatching one command frame. `notify_text`, when
/// non-empty, fans out to notification sinks; `reply_text` always returns to the command source.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub notify_text: Option<String>,
    pub reply_text: String,
    pub notify_level: NotifyLevel,
}

impl CommandResult {
    fn reply(text: impl Into<String>) -> Self {
        Self {
            notify_text: None,
            reply_text: text.into(),
            notify_level: NotifyLevel::Log,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            notify_text: None,
            reply_text: text.into(),
            notify_level: NotifyLevel::Error,
        }
    }

    fn notify_and_reply(notify: impl Into<String>, reply: impl Into<String>, level: NotifyLevel) -> Self {
        let notify = notify.into();
        Self {
            notify_text: Some(notify),
            reply_text: reply.into(),
            notify_level: level,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unrecognized command {0:?}")]
    UnknownVerb(String),
    #[error("{0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClearTarget {
    Purpose(Purpose),
    All,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PriceCmp {
    LessThan,
    GreaterThan,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AmountSpec {
    Base(Decimal),
    Quote(Decimal),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PriceSpec {
    Limit(Decimal),
    Market,
}

#[derive(Debug, Clone, PartialEq)]
enum ParsedCommand {
    StartLadder {
        amount: Decimal,
        coin: AmountCoin,
        count: u32,
        step_percent: Decimal,
        mid: Option<Decimal>,
        confirmed: bool,
    },
    Stop,
    Clear {
        pair: Option<Pair>,
        target: ClearTarget,
        side: Option<Side>,
        price_filter: Option<(PriceCmp, Decimal)>,
        force: bool,
    },
    Trade {
        side: Side,
        pair: Option<Pair>,
        amount: AmountSpec,
        price: PriceSpec,
        confirmed: bool,
    },
    Fill {
        pair: Option<Pair>,
        side: Side,
        amount: AmountSpec,
        low: Decimal,
        high: Decimal,
        count: u32,
        confirmed: bool,
    },
    Orders {
        pair: Option<Pair>,
        purpose: Option<Purpose>,
        full: bool,
    },
    Balances {
        full: bool,
    },
    Rates {
        target: Option<String>,
    },
    Calc {
        amount: Decimal,
        from: Asset,
        to: Asset,
    },
    Stats {
        pair: Option<Pair>,
    },
    Pair {
        pair: Option<Pair>,
    },
    Deposit {
        coin: Asset,
    },
    Info {
        coin: Asset,
    },
    Params,
    Version,
    Help,
    Confirm,
}

fn expand_alias(tokens: &mut Vec<String>) {
    if let Some(first) = tokens.first() {
        if let Some((_, canonical)) = ALIASES.iter().find(|(short, _)| *short == first) {
            let mut expanded: Vec<String> = canonical.split_whitespace().map(str::to_string).collect();
            expanded.extend(tokens.drain(1..));
            *tokens = expanded;
        }
    }
}

/// Tokenizes `text` (optional leading `/`, whitespace-collapsed, verb case-folded) and parses it
/// into a [`ParsedCommand`].
fn parse_command(text: &str) -> Result<ParsedCommand, ParseError> {
    let text = text.strip_prefix('/').unwrap_or(text);
    let mut tokens: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    tokens[0] = tokens[0].to_ascii_lowercase();
    expand_alias(&mut tokens);

    let confirmed = take_flag(&mut tokens, "-y");
    let verb = tokens.remove(0);
    let rest = tokens;

    match verb.as_str() {
        "start" => parse_start(&rest, confirmed),
        "stop" => Ok(ParsedCommand::Stop),
        "clear" => parse_clear(&rest),
        "buy" => parse_trade(Side::Buy, &rest, confirmed),
        "sell" => parse_trade(Side::Sell, &rest, confirmed),
        "fill" => parse_fill(&rest, confirmed),
        "orders" => parse_orders(&rest),
        "balances" => Ok(ParsedCommand::Balances {
            full: rest.iter().any(|t| t.eq_ignore_ascii_case("full")),
        }),
        "rates" => Ok(ParsedCommand::Rates {
            target: rest.first().cloned(),
        }),
        "calc" => parse_calc(&rest),
        "stats" => Ok(ParsedCommand::Stats {
            pair: parse_optional_pair(rest.first()),
        }),
        "pair" => Ok(ParsedCommand::Pair {
            pair: parse_optional_pair(rest.first()),
        }),
        "deposit" => rest
            .first()
            .map(|coin| ParsedCommand::Deposit { coin: Asset::new(coin) })
            .ok_or_else(|| ParseError::Malformed("deposit requires a coin".into())),
        "info" => rest
            .first()
            .map(|coin| ParsedCommand::Info { coin: Asset::new(coin) })
            .ok_or_else(|| ParseError::Malformed("info requires a coin".into())),
        "params" => Ok(ParsedCommand::Params),
        "version" => Ok(ParsedCommand::Version),
        "help" => Ok(ParsedCommand::Help),
        "y" => Ok(ParsedCommand::Confirm),
        other => Err(ParseError::UnknownVerb(other.to_string())),
    }
}

fn take_flag(tokens: &mut Vec<String>, flag: &str) -> bool {
    if let Some(pos) = tokens.iter().position(|t| t.eq_ignore_ascii_case(flag)) {
        tokens.remove(pos);
        true
    } else {
        false
    }
}

fn parse_optional_pair(token: Option<&String>) -> Option<Pair> {
    token.and_then(|t| Pair::from_str(t).ok())
}

/// Consumes a leading `BASE/QUOTE` token if present, returning the rest of the tokens.
fn split_leading_pair(tokens: &[String]) -> (Option<Pair>, &[String]) {
    match tokens.first() {
        Some(first) if first.contains('/') => (Pair::from_str(first).ok(), &tokens[1..]),
        _ => (None, tokens),
    }
}

fn parse_decimal(token: &str, what: &str) -> Result<Decimal, ParseError> {
    Decimal::from_str(token).map_err(|_| ParseError::Malformed(format!("invalid {what}: {token:?}")))
}

fn parse_start(tokens: &[String], confirmed: bool) -> Result<ParsedCommand, ParseError> {
    // `start ld <amount> <base|quote-code> <count> <step>% [mid <price> <quote-code>]`
    if tokens.first().map(String::as_str) != Some("ld") {
        return Err(ParseError::Malformed("start requires the 'ld' strategy keyword".into()));
    }
    let tokens = &tokens[1..];
    if tokens.len() < 4 {
        return Err(ParseError::Malformed("start ld requires amount, coin, count and step%".into()));
    }

    let amount = parse_decimal(&tokens[0], "amount")?;
    let coin = match tokens[1].to_ascii_lowercase().as_str() {
        "base" => AmountCoin::Base,
        "quote" => AmountCoin::Quote,
        _ => AmountCoin::Quote,
    };
    let count: u32 = tokens[2]
        .parse()
        .map_err(|_| ParseError::Malformed(format!("invalid count: {:?}", tokens[2])))?;

    let step_token = tokens[3]
        .strip_suffix('%')
        .ok_or_else(|| ParseError::Malformed("step must end in '%'".into()))?;
    let step_percent = parse_decimal(step_token, "step")?;

    let mid = if tokens.len() >= 6 && tokens[4].eq_ignore_ascii_case("mid") {
        Some(parse_decimal(&tokens[5], "mid price")?)
    } else {
        None
    };

    Ok(ParsedCommand::StartLadder {
        amount,
        coin,
        count,
        step_percent,
        mid,
        confirmed,
    })
}

fn parse_clear(tokens: &[String]) -> Result<ParsedCommand, ParseError> {
    let (pair, tokens) = split_leading_pair(tokens);
    let target_token = tokens
        .first()
        .ok_or_else(|| ParseError::Malformed("clear requires a purpose, 'all' or 'unk'".into()))?;

    let target = match target_token.to_ascii_lowercase().as_str() {
        "all" => ClearTarget::All,
        "unk" | "unknown" => ClearTarget::Unknown,
        other => Purpose::parse(other)
            .map(ClearTarget::Purpose)
            .ok_or_else(|| ParseError::Malformed(format!("unknown clear target {other:?}")))?,
    };

    let mut side = None;
    let mut price_filter = None;
    let mut force = false;

    let mut i = 1;
    while i < tokens.len() {
        let token = &tokens[i];
        if token.eq_ignore_ascii_case("buy") {
            side = Some(Side::Buy);
        } else if token.eq_ignore_ascii_case("sell") {
            side = Some(Side::Sell);
        } else if token.eq_ignore_ascii_case("force") {
            force = true;
        } else if let Some(rest) = token.strip_prefix('>') {
            price_filter = Some((PriceCmp::GreaterThan, parse_decimal(rest, "price")?));
            i += 1; // skip the trailing quote-code token
        } else if let Some(rest) = token.strip_prefix('<') {
            price_filter = Some((PriceCmp::LessThan, parse_decimal(rest, "price")?));
            i += 1;
        }
        i += 1;
    }

    Ok(ParsedCommand::Clear {
        pair,
        target,
        side,
        price_filter,
        force,
    })
}

fn parse_amount_spec(tokens: &[String]) -> Result<AmountSpec, ParseError> {
    let mut base = None;
    let mut quote = None;
    for token in tokens {
        if let Some(value) = token.strip_prefix("amount=") {
            base = Some(parse_decimal(value, "amount")?);
        } else if let Some(value) = token.strip_prefix("quote=") {
            quote = Some(parse_decimal(value, "quote")?);
        }
    }
    match (base, quote) {
        (Some(_), Some(_)) => Err(ParseError::Malformed(
            "specify exactly one of amount= or quote=, not both".into(),
        )),
        (Some(amount), None) => Ok(AmountSpec::Base(amount)),
        (None, Some(quote)) => Ok(AmountSpec::Quote(quote)),
        (None, None) => Err(ParseError::Malformed("specify amount= or quote=".into())),
    }
}

fn parse_price_spec(tokens: &[String]) -> Result<PriceSpec, ParseError> {
    for token in tokens {
        if let Some(value) = token.strip_prefix("price=") {
            if value.eq_ignore_ascii_case("market") {
                return Ok(PriceSpec::Market);
            }
            return Ok(PriceSpec::Limit(parse_decimal(value, "price")?));
        }
    }
    Err(ParseError::Malformed("specify price=<n> or price=market".into()))
}

fn parse_trade(side: Side, tokens: &[String], confirmed: bool) -> Result<ParsedCommand, ParseError> {
    let (pair, tokens) = split_leading_pair(tokens);
    let amount = parse_amount_spec(tokens)?;
    let price = parse_price_spec(tokens)?;
    Ok(ParsedCommand::Trade {
        side,
        pair,
        amount,
        price,
        confirmed,
    })
}

fn parse_fill(tokens: &[String], confirmed: bool) -> Result<ParsedCommand, ParseError> {
    let (pair, tokens) = split_leading_pair(tokens);
    let side = match tokens.first().map(|t| t.to_ascii_lowercase()) {
        Some(ref s) if s == "buy" => Side::Buy,
        Some(ref s) if s == "sell" => Side::Sell,
        _ => return Err(ParseError::Malformed("fill requires 'buy' or 'sell'".into())),
    };
    let tokens = &tokens[1..];

    let amount = parse_amount_spec(tokens)?;

    let mut low = None;
    let mut high = None;
    let mut count = None;
    for token in tokens {
        if let Some(value) = token.strip_prefix("low=") {
            low = Some(parse_decimal(value, "low")?);
        } else if let Some(value) = token.strip_prefix("high=") {
            high = Some(parse_decimal(value, "high")?);
        } else if let Some(value) = token.strip_prefix("count=") {
            count = Some(
                value
                    .parse::<u32>()
                    .map_err(|_| ParseError::Malformed(format!("invalid count: {value:?}")))?,
            );
        }
    }

    let (low, high, count) = match (low, high, count) {
        (Some(low), Some(high), Some(count)) => (low, high, count),
        _ => return Err(ParseError::Malformed("fill requires low=, high= and count=".into())),
    };

    Ok(ParsedCommand::Fill {
        pair,
        side,
        amount,
        low,
        high,
        count,
        confirmed,
    })
}

fn parse_orders(tokens: &[String]) -> Result<ParsedCommand, ParseError> {
    let (pair, tokens) = split_leading_pair(tokens);
    let full = tokens.iter().any(|t| t.eq_ignore_ascii_case("full"));
    let purpose = tokens
        .iter()
        .find(|t| !t.eq_ignore_ascii_case("full"))
        .and_then(|t| Purpose::parse(t));

    Ok(ParsedCommand::Orders { pair, purpose, full })
}

fn parse_calc(tokens: &[String]) -> Result<ParsedCommand, ParseError> {
    // `calc <amount> <from-coin> in <to-coin>`
    if tokens.len() != 4 || !tokens[2].eq_ignore_ascii_case("in") {
        return Err(ParseError::Malformed("usage: calc <amount> <from-coin> in <to-coin>".into()));
    }
    Ok(ParsedCommand::Calc {
        amount: parse_decimal(&tokens[0], "amount")?,
        from: Asset::new(&tokens[1]),
        to: Asset::new(&tokens[3]),
    })
}

/// Parses chat lines, routes to command handlers, and enforces the confirmation protocol
///. Owns `Arc`-shared references to the collaborators a handler may need so it can
/// be driven from the command-intake task alongside the scheduler's ladder/reconciliation tasks.
pub struct CommandDispatcher {
    pub store: Arc<InMemoryOrderStore>,
    pub adapter: Arc<dyn ExchangeAdapter>,
    pub rates: Arc<dyn RatesOracle>,
    pub state: Arc<EngineState>,
    pub default_pair: Pair,
    pub amount_to_confirm_usd: Decimal,
}

impl CommandDispatcher {
    fn resolve_pair(&self, pair: Option<Pair>) -> Pair {
        pair.unwrap_or_else(|| self.default_pair.clone())
    }

    /// Dispatches one command frame. Never panics on malformed input; every failure becomes a
    /// `reply_text`-only [`CommandResult`].
    pub async fn dispatch(&self, text: &str, sender: &str) -> CommandResult {
        let parsed = match parse_command(text) {
            Ok(parsed) => parsed,
            Err(error) => return CommandResult::error(error.to_string()),
        };

        if let ParsedCommand::Confirm = parsed {
            return self.handle_confirm().await;
        }

        self.handle(parsed, sender, text).await
    }

    async fn handle_confirm(&self) -> CommandResult {
        let Some(pending) = self.state.take_pending_confirmation().await else {
            return CommandResult::reply("no command is awaiting confirmation");
        };

        if pending.is_expired(Utc::now()) {
            return CommandResult::reply("confirmation expired, please re-issue the command");
        }

        let confirmed_text = format!("{} -y", pending.command_text);
        let confirmed = match parse_command(&confirmed_text) {
            Ok(confirmed) => confirmed,
            Err(error) => return CommandResult::error(error.to_string()),
        };

        self.handle(confirmed, "confirmation", &confirmed_text).await
    }

    async fn handle(&self, command: ParsedCommand, sender: &str, original_text: &str) -> CommandResult {
        match command {
            ParsedCommand::StartLadder {
                amount,
                coin,
                count,
                step_percent,
                mid,
                confirmed,
            } => {
                self.handle_start_ladder(amount, coin, count, step_percent, mid, confirmed, original_text)
                    .await
            }
            ParsedCommand::Stop => self.handle_stop().await,
            ParsedCommand::Clear {
                pair,
                target,
                side,
                price_filter,
                force,
            } => self.handle_clear(pair, target, side, price_filter, force).await,
            ParsedCommand::Trade {
                side,
                pair,
                amount,
                price,
                confirmed,
            } => self.handle_trade(side, pair, amount, price, confirmed, original_text).await,
            ParsedCommand::Fill {
                pair,
                side,
                amount,
                low,
                high,
                count,
                confirmed,
            } => {
                self.handle_fill(pair, side, amount, low, high, count, confirmed, original_text)
                    .await
            }
            ParsedCommand::Orders { pair, purpose, full } => self.handle_orders(pair, purpose, full, sender).await,
            ParsedCommand::Balances { full } => self.handle_balances(full, sender).await,
            ParsedCommand::Rates { target } => self.handle_rates(target).await,
            ParsedCommand::Calc { amount, from, to } => self.handle_calc(amount, from, to).await,
            ParsedCommand::Stats { pair } => self.handle_stats(pair).await,
            ParsedCommand::Pair { pair } => self.handle_pair(pair).await,
            ParsedCommand::Deposit { coin } => self.handle_deposit(coin).await,
            ParsedCommand::Info { coin } => self.handle_info(coin).await,
            ParsedCommand::Params => self.handle_params().await,
            ParsedCommand::Version => CommandResult::reply(format!("ladderbot {}", env!("CARGO_PKG_VERSION"))),
            ParsedCommand::Help => CommandResult::reply(HELP_TEXT),
            ParsedCommand::Confirm => unreachable!("Confirm is handled by dispatch() before reaching handle()"),
        }
    }

    /// Estimated USD impact of committing `amount` of `asset`, per spec §4.6 confirmation
    /// protocol item 1 ("RatesOracle conversion of `amount` to USD").
    async fn usd_impact(&self, asset: &Asset, amount: Decimal) -> Decimal {
        match self.rates.convert(asset, &Asset::new("USD"), amount).await {
            Ok(conversion) => conversion.out_amount,
            Err(error) => {
                warn!(%error, "usd_impact: conversion failed, treating as requiring confirmation");
                Decimal::MAX
            }
        }
    }

    async fn requires_confirmation(&self, asset: &Asset, amount: Decimal) -> bool {
        self.usd_impact(asset, amount).await > self.amount_to_confirm_usd
    }

    async fn arm_confirmation(&self, original_text: &str) -> CommandResult {
        self.state
            .set_pending_confirmation(PendingConfirmation::new(original_text, Utc::now()))
            .await;
        CommandResult::reply(format!(
            "this action exceeds the confirmation threshold; reply /y within 10 minutes to confirm: {original_text}"
        ))
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_start_ladder(
        &self,
        amount: Decimal,
        coin: AmountCoin,
        count: u32,
        step_percent: Decimal,
        mid: Option<Decimal>,
        confirmed: bool,
        original_text: &str,
    ) -> CommandResult {
        let pair = self.default_pair.clone();

        if !confirmed {
            let asset = match coin {
                AmountCoin::Base => pair.base.clone(),
                AmountCoin::Quote => pair.quote.clone(),
            };
            if self.requires_confirmation(&asset, amount).await {
                return self.arm_confirmation(original_text).await;
            }
        }

        let mut config = LadderConfig::new(amount, coin, count, step_percent);
        config.reinit_requested = true;
        config.active = true;
        if let Some(mid_price) = mid {
            config.mid_origin = MidOrigin::Manual;
            config.mid_price = mid_price;
        }

        let committed = self
            .state
            .update_trade_params(&pair, |params| {
                params.ladder = config.clone();
                params.co_active = true;
            })
            .await;

        if !committed {
            self.state
                .set_trade_params(pair.clone(), TradeParams::new(config))
                .await;
        }

        CommandResult::notify_and_reply(
            format!("{pair}: ladder armed, {count} rungs/side, {step_percent}% step"),
            "ladder configured, will re-layout on the next tick",
            NotifyLevel::Info,
        )
    }

    async fn handle_stop(&self) -> CommandResult {
        let pair = self.default_pair.clone();
        self.state
            .update_trade_params(&pair, |params| params.co_active = false)
            .await;
        CommandResult::notify_and_reply(
            format!("{pair}: trading stopped"),
            "stopped (existing orders were left in place)",
            NotifyLevel::Warn,
        )
    }

    async fn handle_clear(
        &self,
        pair: Option<Pair>,
        target: ClearTarget,
        side: Option<Side>,
        price_filter: Option<(PriceCmp, Decimal)>,
        force: bool,
    ) -> CommandResult {
        let pair = self.resolve_pair(pair);
        let collector = OrderCollector::new(&self.store);
        let predicate = price_filter.map(|(cmp, price)| match cmp {
            PriceCmp::LessThan => PricePredicate::LessThan(price),
            PriceCmp::GreaterThan => PricePredicate::GreaterThan(price),
        });

        let outcome = match target {
            ClearTarget::All => collector.clear_all(self.adapter.as_ref(), &pair, side, force).await,
            ClearTarget::Unknown => collector.clear_unknown(self.adapter.as_ref(), &pair, side, force).await,
            ClearTarget::Purpose(purpose) => {
                collector
                    .clear_local(self.adapter.as_ref(), &[purpose], &pair, side, predicate, force)
                    .await
            }
        };

        CommandResult::notify_and_reply(
            format!("{pair}: {}", outcome.human_message),
            outcome.human_message.clone(),
            NotifyLevel::Info,
        )
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_trade(
        &self,
        side: Side,
        pair: Option<Pair>,
        amount: AmountSpec,
        price: PriceSpec,
        confirmed: bool,
        original_text: &str,
    ) -> CommandResult {
        let pair = self.resolve_pair(pair);

        let Some(spec) = self.state.market_spec(&pair).await else {
            return CommandResult::error(format!("unknown market {pair}"));
        };

        if !confirmed {
            let (asset, raw_amount) = match amount {
                AmountSpec::Base(amount) => (pair.base.clone(), amount),
                AmountSpec::Quote(amount) => (pair.quote.clone(), amount),
            };
            if self.requires_confirmation(&asset, raw_amount).await {
                return self.arm_confirmation(original_text).await;
            }
        }

        let order_type = match price {
            PriceSpec::Market => OrderType::Market,
            PriceSpec::Limit(_) => OrderType::Limit,
        };

        if order_type == OrderType::Market && !self.adapter.capabilities().place_market_order {
            return CommandResult::error("this venue does not support market orders".to_string());
        }

        let price_value = match price {
            PriceSpec::Limit(price) => Some(round_price(&spec, price)),
            PriceSpec::Market => None,
        };

        let (base_amount, quote_amount) = match (amount, price_value) {
            (AmountSpec::Base(amount), _) => (Some(round_amount(&spec, amount)), None),
            (AmountSpec::Quote(amount), Some(price)) => (Some(round_amount(&spec, amount / price)), None),
            (AmountSpec::Quote(amount), None) => (None, Some(amount)),
        };

        let result = self
            .adapter
            .place_order(&pair, side, order_type, price_value, base_amount, quote_amount)
            .await;

        self.record_and_reply_manual(pair, side, order_type, price_value, base_amount, result)
    }

    fn record_and_reply_manual(
        &self,
        pair: Pair,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        amount: Option<Decimal>,
        result: Result<PlaceOrderAck, ladder_execution::error::AdapterError>,
    ) -> CommandResult {
        match result {
            Ok(ack) => {
                let id = self.store.next_id();
                let mut order = Order::new_pending(
                    id,
                    pair.clone(),
                    side,
                    order_type,
                    price.unwrap_or_default(),
                    amount.unwrap_or_default(),
                    price.unwrap_or_default() * amount.unwrap_or_default(),
                    Purpose::Manual,
                    None,
                    Utc::now(),
                );
                if let Some(venue_id) = ack.venue_id.clone() {
                    order.venue_id = Some(venue_id);
                    order.ladder_state = LadderState::Placed;
                } else {
                    order.ladder_state = LadderState::NotPlaced;
                    order.ladder_not_placed_reason = Some(ack.message.clone());
                }
                let _ = self.store.insert(order);

                CommandResult::notify_and_reply(
                    format!("{pair}: manual {side} placed — {}", ack.message),
                    format!("order placed: {}", ack.message),
                    NotifyLevel::Info,
                )
            }
            Err(error) => CommandResult::error(format!("order rejected: {error}")),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_fill(
        &self,
        pair: Option<Pair>,
        side: Side,
        amount: AmountSpec,
        low: Decimal,
        high: Decimal,
        count: u32,
        confirmed: bool,
        original_text: &str,
    ) -> CommandResult {
        let pair = self.resolve_pair(pair);
        let Some(spec) = self.state.market_spec(&pair).await else {
            return CommandResult::error(format!("unknown market {pair}"));
        };

        if low >= high {
            return CommandResult::error("low must be strictly less than high".to_string());
        }

        if !confirmed {
            let (asset, raw_amount) = match amount {
                AmountSpec::Base(amount) => (pair.base.clone(), amount),
                AmountSpec::Quote(amount) => (pair.quote.clone(), amount),
            };
            // total committed exposure across every scattered rung, not just one.
            if self
                .requires_confirmation(&asset, raw_amount * Decimal::from(count))
                .await
            {
                return self.arm_confirmation(original_text).await;
            }
        }

        let mut placed = 0u32;
        let mut rng = rand::thread_rng();

        for _ in 0..count {
            let fraction: f64 = rng.gen_range(0.0..=1.0);
            let span = high - low;
            let raw_price = low + span * Decimal::try_from(fraction).unwrap_or_default();
            let price = round_price(&spec, raw_price);

            let raw_amount = match amount {
                AmountSpec::Base(amount) => amount,
                AmountSpec::Quote(amount) => amount / price,
            };
            let rounded_amount = round_amount(&spec, raw_amount);

            if validate_amount(&spec, price, rounded_amount).is_err() {
                continue;
            }

            if let Ok(ack) = self
                .adapter
                .place_order(&pair, side, OrderType::Limit, Some(price), Some(rounded_amount), None)
                .await
            {
                let id = self.store.next_id();
                let mut order = Order::new_pending(
                    id,
                    pair.clone(),
                    side,
                    OrderType::Limit,
                    price,
                    rounded_amount,
                    price * rounded_amount,
                    Purpose::Manual,
                    None,
                    Utc::now(),
                );
                if let Some(venue_id) = ack.venue_id {
                    order.venue_id = Some(venue_id);
                    order.ladder_state = LadderState::Placed;
                    placed += 1;
                } else {
                    order.ladder_state = LadderState::NotPlaced;
                }
                let _ = self.store.insert(order);
            }
        }

        CommandResult::notify_and_reply(
            format!("{pair}: fill scattered {placed}/{count} {side} order(s) in [{low}, {high}]"),
            format!("placed {placed}/{count} orders"),
            NotifyLevel::Info,
        )
    }

    async fn handle_orders(&self, pair: Option<Pair>, purpose: Option<Purpose>, full: bool, sender: &str) -> CommandResult {
        let pair = self.resolve_pair(pair);
        let mut filter = OrderFilter::default().pair(pair.clone());
        if let Some(purpose) = purpose {
            filter = filter.purpose(purpose);
        }
        let mut orders = self.store.find(&filter);
        orders.sort_by_key(|order| (order.purpose, order.ladder_index, order.created_at));

        let digest = orders
            .iter()
            .map(|order| format!("{}:{}:{}", order.id, order.ladder_state, order.price))
            .collect::<Vec<_>>()
            .join(",");
        let previous_digest = self.state.previous_orders_digest(sender, digest.clone()).await;

        if full {
            let lines: Vec<String> = orders
                .iter()
                .map(|order| {
                    format!(
                        "#{} {} {} {} price={} amount={} state={}",
                        order.id, order.purpose, order.side, order.order_type, order.price, order.amount, order.ladder_state
                    )
                })
                .collect();
            return CommandResult::reply(if lines.is_empty() {
                format!("{pair}: no orders")
            } else {
                lines.join("\n")
            });
        }

        let changed = previous_digest.as_deref() != Some(digest.as_str());
        let placed = orders.iter().filter(|o| o.ladder_state == LadderState::Placed).count();
        let summary = format!(
            "{pair}: {placed} placed order(s){}",
            if changed { " (changed since last check)" } else { "" }
        );
        CommandResult::reply(summary)
    }

    async fn handle_balances(&self, full: bool, sender: &str) -> CommandResult {
        let snapshot = match self.adapter.balances(!full).await {
            Ok(snapshot) => snapshot,
            Err(error) => return CommandResult::error(format!("could not fetch balances: {error}")),
        };

        let previous = self.state.previous_balances(sender, snapshot.clone()).await;

        let mut lines = Vec::new();
        for (asset, balance) in &snapshot.balances {
            let delta = previous
                .as_ref()
                .and_then(|prev| prev.get(asset))
                .map(|prev_balance| balance.total - prev_balance.total)
                .filter(|delta| !delta.is_zero());

            match delta {
                Some(delta) => lines.push(format!("{asset}: {} (free {}) Δ{delta:+}", balance.total, balance.free)),
                None => lines.push(format!("{asset}: {} (free {})", balance.total, balance.free)),
            }
        }

        CommandResult::reply(if lines.is_empty() {
            "no nonzero balances".to_string()
        } else {
            lines.join("\n")
        })
    }

    async fn handle_rates(&self, target: Option<String>) -> CommandResult {
        let Some(target) = target else {
            return CommandResult::error("usage: rates <coin>|<pair>".to_string());
        };

        if let Ok(pair) = Pair::from_str(&target) {
            return match self.rates.convert(&pair.base, &pair.quote, Decimal::ONE).await {
                Ok(conversion) => CommandResult::reply(format!("1 {} = {} {}", pair.base, conversion.out_amount, pair.quote)),
                Err(error) => CommandResult::error(error.to_string()),
            };
        }

        let asset = Asset::new(&target);
        match self.rates.convert(&asset, &Asset::new("USD"), Decimal::ONE).await {
            Ok(conversion) => CommandResult::reply(format!(
                "1 {asset} = {} USD{}",
                conversion.out_amount,
                if conversion.stale { " (stale)" } else { "" }
            )),
            Err(error) => CommandResult::error(error.to_string()),
        }
    }

    async fn handle_calc(&self, amount: Decimal, from: Asset, to: Asset) -> CommandResult {
        match self.rates.convert(&from, &to, amount).await {
            Ok(conversion) => CommandResult::reply(format!("{amount} {from} = {} {to}", conversion.out_amount)),
            Err(error) => CommandResult::error(error.to_string()),
        }
    }

    async fn handle_stats(&self, pair: Option<Pair>) -> CommandResult {
        let pair = self.resolve_pair(pair);
        let ladder_orders = self.store.ordered_by(Purpose::Ladder, &pair);
        let placed = ladder_orders.iter().filter(|o| o.ladder_state == LadderState::Placed).count();
        let filled = ladder_orders.iter().filter(|o| o.ladder_state == LadderState::Filled).count();
        let report = self.state.last_reconcile(&pair).await.unwrap_or_default();

        CommandResult::reply(format!(
            "{pair}: {placed} ladder rungs placed, {filled} filled, {} unknown order(s) on venue",
            report.unknown_orders.len()
        ))
    }

    async fn handle_pair(&self, pair: Option<Pair>) -> CommandResult {
        let pair = self.resolve_pair(pair);
        match self.state.market_spec(&pair).await {
            Some(spec) => CommandResult::reply(format!(
                "{pair}: tick={} step={} min_base={} min_quote={} status={}",
                spec.quote_tick, spec.base_step, spec.min_base_amount, spec.min_quote_amount, spec.status
            )),
            None => CommandResult::error(format!("unknown market {pair}")),
        }
    }

    async fn handle_deposit(&self, coin: Asset) -> CommandResult {
        if !self.adapter.capabilities().get_deposit_address {
            return CommandResult::reply(format!("{coin}: deposit address lookup unsupported on this venue"));
        }
        match self.adapter.deposit_address(&coin).await {
            Ok(addresses) if addresses.is_empty() => CommandResult::reply(format!("{coin}: no deposit address available")),
            Ok(addresses) => {
                let lines: Vec<String> = addresses
                    .iter()
                    .map(|address| format!("{}: {}{}", address.network, address.address, address.memo.as_deref().map(|m| format!(" (memo {m})")).unwrap_or_default()))
                    .collect();
                CommandResult::reply(lines.join("\n"))
            }
            Err(error) => CommandResult::error(error.to_string()),
        }
    }

    async fn handle_info(&self, coin: Asset) -> CommandResult {
        let has_ticker = self.rates.has_ticker(&coin);
        let is_fiat = self.rates.is_fiat(&coin);
        let usd = self
            .rates
            .convert(&coin, &Asset::new("USD"), Decimal::ONE)
            .await
            .map(|c| c.out_amount.to_string())
            .unwrap_or_else(|_| "n/a".to_string());

        CommandResult::reply(format!(
            "{coin}: fiat={is_fiat} has_ticker={has_ticker} 1{coin}={usd}USD"
        ))
    }

    async fn handle_params(&self) -> CommandResult {
        let pair = self.default_pair.clone();
        match self.state.trade_params(&pair).await {
            Some(params) => CommandResult::reply(format!(
                "{pair}: co_active={} ladder.active={} amount={} coin={:?} count={} step={}% mid_origin={:?}",
                params.co_active,
                params.ladder.active,
                params.ladder.amount,
                params.ladder.amount_coin,
                params.ladder.count_per_side,
                params.ladder.step_percent,
                params.ladder.mid_origin
            )),
            None => CommandResult::error(format!("no trade params configured for {pair}")),
        }
    }
}

const HELP_TEXT: &str = "\
start ld <amount> <base|quote> <count> <step>% [mid <price>] [-y]
stop
clear [<pair>] (<purpose>|all|unk) [buy|sell] [(>|<)<price>] [force]
buy|sell [<pair>] (amount=<n>|quote=<n>) [price=<n>|price=market] [-y]
fill [<pair>] (buy|sell) (amount=<n>|quote=<n>) low=<n> high=<n> count=<n> [-y]
orders [<pair>] [<purpose>] [full]
balances [full]
rates [<coin>|<pair>]
calc <amount> <from-coin> in <to-coin>
stats [<pair>]
pair [<pair>]
deposit <coin>
info <coin>
params
version
help
y";

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn strips_optional_slash_and_folds_verb_case() {
        let parsed = parse_command("/STOP").unwrap();
        assert_eq!(parsed, ParsedCommand::Stop);
        let parsed = parse_command("stop").unwrap();
        assert_eq!(parsed, ParsedCommand::Stop);
    }

    #[test]
    fn expands_balance_alias() {
        let parsed = parse_command("/b full").unwrap();
        assert_eq!(parsed, ParsedCommand::Balances { full: true });
    }

    #[test]
    fn parses_start_ladder() {
        let parsed = parse_command("/start ld 300 USDT 3 2%").unwrap();
        assert_eq!(
            parsed,
            ParsedCommand::StartLadder {
                amount: Decimal::from(300),
                coin: AmountCoin::Quote,
                count: 3,
                step_percent: Decimal::from(2),
                mid: None,
                confirmed: false,
            }
        );
    }

    #[test]
    fn rejects_both_amount_and_quote() {
        let error = parse_command("/buy amount=1 quote=2 price=1").unwrap_err();
        assert!(matches!(error, ParseError::Malformed(_)));
    }

    #[test]
    fn parses_clear_with_price_filter() {
        let parsed = parse_command("/clear ADM/USDT ladder sell >1.05 USDT").unwrap();
        assert_eq!(
            parsed,
            ParsedCommand::Clear {
                pair: Some(Pair::new("ADM", "USDT")),
                target: ClearTarget::Purpose(Purpose::Ladder),
                side: Some(Side::Sell),
                price_filter: Some((PriceCmp::GreaterThan, dec!(1.05))),
                force: false,
            }
        );
    }

    #[test]
    fn parses_fill_command() {
        let parsed = parse_command("/fill ADM/USDT buy amount=10 low=0.9 high=1.0 count=5").unwrap();
        assert_eq!(
            parsed,
            ParsedCommand::Fill {
                pair: Some(Pair::new("ADM", "USDT")),
                side: Side::Buy,
                amount: AmountSpec::Base(Decimal::from(10)),
                low: dec!(0.9),
                high: Decimal::ONE,
                count: 5,
                confirmed: false,
            }
        );
    }

    #[test]
    fn confirm_appends_sentinel_without_recursion() {
        let parsed = parse_command("/buy amount=500 price=1.20 -y").unwrap();
        assert_eq!(
            parsed,
            ParsedCommand::Trade {
                side: Side::Buy,
                pair: None,
                amount: AmountSpec::Base(Decimal::from(500)),
                price: PriceSpec::Limit(dec!(1.20)),
                confirmed: true,
            }
        );
    }
}
