//! `StatisticalContext::build` (§4.6): one `RegimeEngine::detect` call plus a
//! set of depth-gated enrichers per requested timeframe. Timeframes are
//! processed sequentially, longest duration first, so a shorter timeframe's
//! enrichers could in principle read the longer timeframe's already-computed
//! regime (none currently do, but the ordering is load-bearing per §5).
//! Within one timeframe, every enricher's indicator fetch runs concurrently,
//! mirroring `multi-timeframe`'s `futures::future::join_all` fan-out.

use std::sync::Arc;

use analysis_core::{
    AnalysisError, GetSeriesRequest, Indicator, IndicatorConfig, IndicatorEngine, MarketAdapter,
    Timeframe,
};
use data_provider::{DataProvider, LoadOhlcvRequest};
use regime_engine::{RegimeEngine, RegimeRequest};

use crate::config::ContextConfig;
use crate::enrichers;
use crate::types::{Depth, FullContext, TimeframeContext, TimeframeSet};

pub struct StatisticalContext<A: MarketAdapter, I: IndicatorEngine> {
    data_provider: Arc<DataProvider<A>>,
    regime_engine: Arc<RegimeEngine<A, I>>,
    indicators: Arc<I>,
    config: ContextConfig,
}

impl<A: MarketAdapter, I: IndicatorEngine> StatisticalContext<A, I> {
    pub fn new(
        data_provider: Arc<DataProvider<A>>,
        regime_engine: Arc<RegimeEngine<A, I>>,
        indicators: Arc<I>,
        config: ContextConfig,
    ) -> Self {
        StatisticalContext {
            data_provider,
            regime_engine,
            indicators,
            config,
        }
    }

    pub async fn build(&self, symbol: &str, timeframes: TimeframeSet) -> Result<FullContext, AnalysisError> {
        let mut result = FullContext::default();
        for timeframe in timeframes.longest_to_shortest() {
            let ctx = self.build_timeframe(symbol, timeframe).await?;
            result.timeframes.push(ctx);
        }
        Ok(result)
    }

    async fn build_timeframe(&self, symbol: &str, timeframe: Timeframe) -> Result<TimeframeContext, AnalysisError> {
        let depth = Depth::for_timeframe(timeframe);
        let lookback = self.config.lookback_periods;

        let (bars_result, regime) = tokio::try_join!(
            self.data_provider.load_ohlcv(LoadOhlcvRequest::new(
                symbol,
                timeframe,
                self.config.bar_count_for(timeframe),
            )),
            self.regime_engine.detect(RegimeRequest::new(
                symbol,
                timeframe,
                self.config.indicator_count_for(timeframe),
            )),
        )?;
        let bars = bars_result.bars;
        let current_close = bars.last().map(|b| b.close).unwrap_or(0.0);

        let make_request = |indicator: Indicator, config: IndicatorConfig| GetSeriesRequest {
            symbol: symbol.to_string(),
            indicator,
            timeframe,
            bars: bars.clone(),
            reference_date: None,
            config,
        };

        // Always computed, regardless of depth: the moving-average posture
        // and ADX summary feed both the narrative and the coherence check.
        let (sma_short, sma_long, ema_short, ema_long) = tokio::try_join!(
            self.indicators
                .get_series(make_request(Indicator::Sma, IndicatorConfig::with_period(lookback.sma_short))),
            self.indicators
                .get_series(make_request(Indicator::Sma, IndicatorConfig::with_period(lookback.sma_long))),
            self.indicators
                .get_series(make_request(Indicator::Ema, IndicatorConfig::with_period(lookback.sma_short))),
            self.indicators
                .get_series(make_request(Indicator::Ema, IndicatorConfig::with_period(lookback.sma_long))),
        )?;
        let moving_averages = enrichers::moving_averages(&sma_short, &sma_long, &ema_short, &ema_long, current_close);
        let adx_summary = enrichers::adx_summary(&regime);

        let mut ctx = TimeframeContext {
            timeframe,
            depth,
            regime: regime.clone(),
            moving_averages: moving_averages.unwrap_or(crate::types::MovingAverageSummary {
                sma_short: current_close,
                sma_long: current_close,
                ema_short: current_close,
                ema_long: current_close,
                golden_cross: false,
                price_above_both: false,
            }),
            adx_summary,
            price_action_basic: None,
            momentum: None,
            volatility: None,
            psar: None,
            price_action_detailed: None,
            support_resistance: None,
            micro_patterns: None,
            coherence: None,
        };

        if depth == Depth::Light {
            ctx.price_action_basic = enrichers::price_action_basic(&bars);
            return Ok(ctx);
        }

        let rsi_cfg = IndicatorConfig::with_period(lookback.rsi);
        let atr_cfg = IndicatorConfig::with_period(lookback.atr);
        let bb_cfg = IndicatorConfig {
            period: Some(lookback.bb_period),
            std_dev: Some(lookback.bb_std_dev),
            ..Default::default()
        };
        let macd_cfg = IndicatorConfig {
            fast_period: Some(lookback.macd_fast),
            slow_period: Some(lookback.macd_slow),
            signal_period: Some(lookback.macd_signal),
            ..Default::default()
        };

        let (rsi, macd, atr, bb_width) = tokio::try_join!(
            self.indicators.get_series(make_request(Indicator::Rsi, rsi_cfg)),
            self.indicators.get_series(make_request(Indicator::Macd, macd_cfg)),
            self.indicators.get_series(make_request(Indicator::Atr, atr_cfg)),
            self.indicators.get_series(make_request(Indicator::BbWidth, bb_cfg)),
        )?;
        ctx.momentum = enrichers::momentum(&rsi, &macd);
        ctx.volatility = enrichers::volatility(&atr, &bb_width, current_close);
        ctx.price_action_basic = enrichers::price_action_basic(&bars);
        ctx.coherence = Some(enrichers::coherence_check(&regime, moving_averages.as_ref(), ctx.momentum.as_ref()));

        if depth == Depth::Medium {
            return Ok(ctx);
        }

        let psar_series = self
            .indicators
            .get_series(make_request(Indicator::Psar, IndicatorConfig::default()))
            .await?;
        ctx.psar = enrichers::psar(&psar_series, current_close);
        ctx.price_action_detailed = enrichers::price_action_detailed(&bars);
        ctx.support_resistance = enrichers::support_resistance(&ema_long, &ema_short, regime.range_bounds.as_ref());
        ctx.micro_patterns = Some(enrichers::micro_patterns(&bars));

        Ok(ctx)
    }
}
