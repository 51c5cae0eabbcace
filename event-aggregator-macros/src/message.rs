use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Ident, Item, Result, parse::Parse, parse::ParseStream, parse_macro_input};

pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as MessageAttrConfig);
    let input = parse_macro_input!(item as Item);

    let (ident, generics) = match &input {
        Item::Struct(st) => (&st.ident, &st.generics),
        Item::Enum(en) => (&en.ident, &en.generics),
        other => {
            return syn::Error::new(other.span(), "#[message] only supports struct or enum")
                .to_compile_error()
                .into();
        }
    };

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = if cfg.loggable {
        quote! {
            fn as_loggable(&self) -> ::std::option::Option<&(dyn ::event_aggregator::Loggable + 'static)> {
                ::std::option::Option::Some(self)
            }
        }
    } else {
        quote! {}
    };

    let out = quote! {
        #input

        impl #impl_generics ::event_aggregator::Message for #ident #ty_generics #where_clause {
            #body
        }
    };

    TokenStream::from(out)
}

// -------- parsing --------

struct MessageAttrConfig {
    loggable: bool,
}

impl Parse for MessageAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.is_empty() {
            return Ok(Self { loggable: false });
        }

        let key: Ident = input.parse()?;
        if key != "loggable" {
            return Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'loggable'",
            ));
        }
        if !input.is_empty() {
            return Err(input.error("unexpected tokens after 'loggable'"));
        }

        Ok(Self { loggable: true })
    }
}
