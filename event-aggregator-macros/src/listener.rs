use proc_macro::TokenStream;
use quote::{ToTokens, quote};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Item, Result, Token, Type, parenthesized, parse::Parse, parse::ParseStream, parse_macro_input};

pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as ListenerAttrConfig);
    let input = parse_macro_input!(item as Item);

    let (ident, generics) = match &input {
        Item::Struct(st) => (&st.ident, &st.generics),
        Item::Enum(en) => (&en.ident, &en.generics),
        other => {
            return syn::Error::new(other.span(), "#[listener] only supports struct or enum")
                .to_compile_error()
                .into();
        }
    };

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    // 未声明能力时沿用 Subscriber 的默认实现
    let body = if cfg.sync.is_empty() && cfg.r#async.is_empty() {
        quote! {}
    } else {
        let sync_caps = cfg.sync.iter().map(|ty| quote! { caps.listen::<#ty>(); });
        let async_caps = cfg.r#async.iter().map(|ty| quote! { caps.listen_async::<#ty>(); });
        quote! {
            fn capabilities(caps: &mut ::event_aggregator::Capabilities<Self>) {
                #( #sync_caps )*
                #( #async_caps )*
            }
        }
    };

    let out = quote! {
        #input

        impl #impl_generics ::event_aggregator::Subscriber for #ident #ty_generics #where_clause {
            #body
        }
    };

    TokenStream::from(out)
}

// -------- parsing --------

// 解析 listener 宏参数：类型列表，外加可选的 async(类型列表)
struct ListenerAttrConfig {
    sync: Vec<Type>,
    r#async: Vec<Type>,
}

enum ListenerAttrElem {
    Sync(Type),
    Async(Punctuated<Type, Token![,]>),
}

impl Parse for ListenerAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.peek(Token![async]) {
            let _: Token![async] = input.parse()?;
            let content;
            parenthesized!(content in input);
            let types = Punctuated::<Type, Token![,]>::parse_terminated(&content)?;
            return Ok(Self::Async(types));
        }
        Ok(Self::Sync(input.parse()?))
    }
}

impl Parse for ListenerAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut sync = Vec::new();
        let mut r#async = Vec::new();

        if input.is_empty() {
            return Ok(Self { sync, r#async });
        }

        let elems: Punctuated<ListenerAttrElem, Token![,]> = Punctuated::parse_terminated(input)?;

        for elem in elems {
            match elem {
                ListenerAttrElem::Sync(ty) => push_unique(&mut sync, ty)?,
                ListenerAttrElem::Async(types) => {
                    for ty in types {
                        push_unique(&mut r#async, ty)?;
                    }
                }
            }
        }

        Ok(Self { sync, r#async })
    }
}

// 以 token 文本比较类型，避免依赖 syn 的 extra-traits
fn push_unique(list: &mut Vec<Type>, ty: Type) -> Result<()> {
    let key = ty.to_token_stream().to_string();
    if list.iter().any(|t| t.to_token_stream().to_string() == key) {
        return Err(syn::Error::new(ty.span(), "duplicate capability in #[listener]"));
    }
    list.push(ty);
    Ok(())
}
