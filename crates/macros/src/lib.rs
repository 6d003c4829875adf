use proc_macro::TokenStream;
use quote::{format_ident, quote};

/// Arguments of the `#[comparer]` attribute.
///
/// `phase` names the `ScorePhase` variant the comparer reports under, and
/// `weight`/`toggle` name the `WeightsConfig` fields the scoring pipeline
/// consults for it.
#[derive(deluxe::ParseMetaItem)]
#[deluxe(attributes(comparer))]
struct ComparerArgs {
  name: String,
  phase: syn::Ident,
  weight: syn::Ident,
  toggle: syn::Ident,
}

/// Turn an annotated `compare` function into a scoring phase.
///
/// Emits the phase's unit struct (named after the phase variant, so
/// `NameComparison` yields `NameComparer`) and a `Comparer` impl wiring up the
/// phase tag, its weight and enable flag, and a trace-level span around the
/// comparison itself.
#[proc_macro_attribute]
pub fn comparer(attrs: TokenStream, input: TokenStream) -> TokenStream {
  let ComparerArgs { name, phase, weight, toggle } = match deluxe::parse2(attrs.into()) {
    Ok(args) => args,
    Err(err) => return err.into_compile_error().into(),
  };

  let ident = format_ident!("{}Comparer", phase.to_string().trim_end_matches("Comparison"));
  let compare = proc_macro2::TokenStream::from(input);

  quote! {
    pub struct #ident;

    impl Comparer for #ident {
      fn name(&self) -> &'static str {
        #name
      }

      fn phase(&self) -> crate::scoring::ScorePhase {
        crate::scoring::ScorePhase::#phase
      }

      fn weight(&self, weights: &crate::config::WeightsConfig) -> f64 {
        weights.#weight
      }

      fn enabled(&self, weights: &crate::config::WeightsConfig) -> bool {
        weights.#toggle
      }

      #[tracing::instrument(level = "trace", name = #name, skip_all, fields(entity_id = candidate.id))]
      #compare
    }
  }
  .into()
}
